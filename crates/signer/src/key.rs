//! Shared secret used as the HMAC key.

use crate::error::{SignerError, SignerResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// The deployment-wide signing secret.
///
/// The raw bytes of the configured string are the HMAC key, so two
/// deployments configured with the same string produce identical signatures.
#[derive(Clone)]
pub struct SecretKey {
    mac: HmacSha256,
}

impl SecretKey {
    /// Build a key from the configured secret string.
    pub fn new(secret: impl AsRef<str>) -> SignerResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignerError::InvalidKey("secret must not be empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// A fresh MAC keyed with this secret.
    pub(crate) fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_rejected() {
        assert!(matches!(SecretKey::new(""), Err(SignerError::InvalidKey(_))));
    }

    #[test]
    fn debug_does_not_leak() {
        let key = SecretKey::new("hunter2-hunter2").unwrap();
        assert_eq!(format!("{key:?}"), "SecretKey([REDACTED])");
    }
}
