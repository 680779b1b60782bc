//! Signed link issuance.
//!
//! Links have the shape
//! `{base_url}/{path}?expires={unix_secs}&signature={hex}`.

use crate::error::{SignerError, SignerResult};
use crate::key::SecretKey;
use crate::signer::UrlSigner;
use crate::ttl::Ttl;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reelgate_core::Clock;
use std::fmt;
use std::sync::Arc;

/// Characters escaped when a storage key is placed in a URL path. `/` and
/// the usual key characters pass through untouched; the proxy decodes the
/// path before verifying, so the signature is always over the raw key.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// An issued link and its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedLink {
    pub url: String,
    pub path: String,
    pub expires_at: i64,
    pub signature: String,
}

impl fmt::Display for SignedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Strip one leading `/` and reject paths the URL scheme cannot carry.
fn normalize_path(path: &str) -> SignerResult<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        return Err(SignerError::InvalidPath("path must not be empty".to_string()));
    }
    if path.contains(['?', '#']) {
        return Err(SignerError::InvalidPath(format!(
            "path must not contain a query string or fragment: {path}"
        )));
    }
    Ok(path)
}

fn issue_with(base_url: &str, path: &str, ttl: Ttl, signer: &UrlSigner) -> SignerResult<SignedLink> {
    let path = normalize_path(path)?;
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    let expires_at = signer.expires_at(ttl.as_secs())?;
    let signature = signer.sign(path, expires_at);
    let encoded = utf8_percent_encode(path, PATH_ESCAPE);

    Ok(SignedLink {
        url: format!("{base}/{encoded}?expires={expires_at}&signature={signature}"),
        path: path.to_string(),
        expires_at,
        signature,
    })
}

/// Issue a signed link for `path` valid for `ttl` from the clock's now.
pub fn issue_link(
    base_url: &str,
    path: &str,
    ttl: Ttl,
    secret: &SecretKey,
    clock: Arc<dyn Clock>,
) -> SignerResult<SignedLink> {
    let signer = UrlSigner::new(secret.clone(), clock);
    issue_with(base_url, path, ttl, &signer)
}

/// Issues links for a fixed base URL and secret.
#[derive(Clone, Debug)]
pub struct LinkIssuer {
    base_url: String,
    signer: UrlSigner,
}

impl LinkIssuer {
    pub fn new(base_url: impl Into<String>, secret: SecretKey, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url: base_url.into(),
            signer: UrlSigner::new(secret, clock),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn issue(&self, path: &str, ttl: Ttl) -> SignerResult<SignedLink> {
        issue_with(&self.base_url, path, ttl, &self.signer)
    }
}
