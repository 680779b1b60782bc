//! Signer error types.

use thiserror::Error;

/// Signing and link issuance errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("invalid secret key: {0}")]
    InvalidKey(String),

    #[error("invalid ttl: {0}")]
    InvalidTtl(String),

    #[error("invalid resource path: {0}")]
    InvalidPath(String),

    #[error("expiry overflows: now {now} + ttl {ttl}")]
    ExpiryOverflow { now: i64, ttl: u64 },
}

/// Result type for signing operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;
