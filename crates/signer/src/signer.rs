//! Signed-URL signing and verification.
//!
//! The signed message is the UTF-8 string `"{path}:{expires}"`. A `:` inside
//! the path is not escaped; the verifier rebuilds the same string, so paths
//! containing `:` must match byte-for-byte.

use crate::error::{SignerError, SignerResult};
use crate::key::SecretKey;
use hmac::Mac;
use reelgate_core::Clock;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Why a signed request was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureFailure {
    /// `expires` or `signature` absent.
    MissingParams,
    /// `expires` not an integer, or already in the past.
    Expired,
    /// Signature does not match the path and expiry.
    Mismatch,
}

impl SignatureFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingParams => "missing-params",
            Self::Expired => "expired",
            Self::Mismatch => "signature-mismatch",
        }
    }
}

impl fmt::Display for SignatureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the signature for `path` valid until `expires_at`.
///
/// Returns 64 lowercase hex characters.
pub fn sign(path: &str, expires_at: i64, secret: &SecretKey) -> String {
    let message = format!("{path}:{expires_at}");
    let mut mac = secret.mac();
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check `signature` against the expected one in constant time.
///
/// Comparison is on the hex string itself, so an upper-cased digit fails.
/// Expiry is not considered here; see [`UrlSigner::verify`].
pub fn verify(path: &str, expires_at: i64, signature: &str, secret: &SecretKey) -> bool {
    let expected = sign(path, expires_at, secret);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Signs and verifies against an injected clock.
#[derive(Clone)]
pub struct UrlSigner {
    secret: SecretKey,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("secret", &self.secret)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: SecretKey, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> i64 {
        self.clock.unix_now()
    }

    /// Expiry timestamp for a link issued now with the given lifetime.
    pub fn expires_at(&self, ttl_secs: u64) -> SignerResult<i64> {
        let now = self.now();
        i64::try_from(ttl_secs)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(SignerError::ExpiryOverflow { now, ttl: ttl_secs })
    }

    pub fn sign(&self, path: &str, expires_at: i64) -> String {
        sign(path, expires_at, &self.secret)
    }

    /// Signature check with expiry: a past `expires_at` always fails.
    pub fn verify(&self, path: &str, expires_at: i64, signature: &str) -> bool {
        expires_at >= self.now() && verify(path, expires_at, signature, &self.secret)
    }

    /// Validate raw `expires`/`signature` query values for `path`.
    pub fn check(
        &self,
        path: &str,
        expires: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), SignatureFailure> {
        let (Some(expires), Some(signature)) = (expires, signature) else {
            return Err(SignatureFailure::MissingParams);
        };

        let expires_at: i64 = expires.parse().map_err(|_| SignatureFailure::Expired)?;
        if expires_at < self.now() {
            return Err(SignatureFailure::Expired);
        }

        if verify(path, expires_at, signature, &self.secret) {
            Ok(())
        } else {
            Err(SignatureFailure::Mismatch)
        }
    }
}
