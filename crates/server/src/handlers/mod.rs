//! HTTP request handlers.

pub mod health;
pub mod objects;

pub use health::*;
pub use objects::*;
