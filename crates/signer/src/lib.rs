//! Signed-URL protocol for reelgate.
//!
//! This crate provides:
//! - HMAC-SHA256 signatures over `"{path}:{expires}"`
//! - Clock-aware verification of signed requests
//! - Link issuance for the CLI and embedding applications
//! - TTL parsing with the usual shorthand aliases

pub mod error;
pub mod key;
pub mod link;
pub mod signer;
pub mod ttl;

pub use error::{SignerError, SignerResult};
pub use key::SecretKey;
pub use link::{LinkIssuer, SignedLink, issue_link};
pub use signer::{SignatureFailure, UrlSigner, sign, verify};
pub use ttl::Ttl;
