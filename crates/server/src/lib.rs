//! HTTP proxy for reelgate.
//!
//! This crate provides:
//! - Signed-URL and referer access checks as an ordered policy pipeline
//! - Range-aware object streaming from any [`reelgate_storage::ObjectStore`]
//! - CORS preflight handling and a health endpoint
//! - Optional Prometheus metrics

pub mod error;
pub mod handlers;
pub mod headers;
pub mod metrics;
pub mod policy;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use policy::{AccessDecision, AccessPipeline, AccessPolicy, AccessReason, AccessRequest};
pub use routes::create_router;
pub use state::AppState;
