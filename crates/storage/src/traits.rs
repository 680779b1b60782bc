//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reelgate_core::{ByteRange, ServedRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::pin::Pin;
use time::OffsetDateTime;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// HTTP-facing metadata stored alongside an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
}

impl ObjectAttributes {
    /// Attributes carrying only a content type.
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content_type.is_none()
            && self.content_disposition.is_none()
            && self.content_encoding.is_none()
    }
}

/// Object metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Total object size in bytes.
    pub size: u64,
    /// Strong entity tag, quoted (`"..."`).
    pub etag: String,
    /// Last modification time, when the backend reports one.
    pub last_modified: Option<OffsetDateTime>,
    /// Stored HTTP attributes.
    pub attributes: ObjectAttributes,
}

/// Result of a (possibly ranged) read.
pub struct GetResult {
    pub meta: ObjectMeta,
    /// The byte range actually served. `None` means the whole object.
    pub range: Option<ServedRange>,
    pub body: ByteStream,
}

impl GetResult {
    /// Number of bytes `body` will yield.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.meta.size, |r| r.length)
    }
}

impl fmt::Debug for GetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetResult")
            .field("meta", &self.meta)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

/// Wrap an etag in quotes unless the backend already did.
pub fn quote_etag(etag: &str) -> String {
    let etag = etag.trim();
    if etag.starts_with('"') || etag.starts_with("W/\"") {
        etag.to_string()
    } else {
        format!("\"{etag}\"")
    }
}

/// Object storage capability.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's metadata without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Open an object for streaming, optionally restricted to a byte range.
    ///
    /// Fails with `RangeNotSatisfiable` when `range` lies outside the object.
    async fn get(&self, key: &str, range: Option<ByteRange>) -> StorageResult<GetResult>;

    /// Put an object atomically.
    async fn put(&self, key: &str, data: Bytes, attributes: &ObjectAttributes)
    -> StorageResult<()>;

    /// Upload a local file without reading it fully into memory.
    ///
    /// Returns the number of bytes stored.
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        attributes: &ObjectAttributes,
    ) -> StorageResult<u64>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable and writable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_etag_is_idempotent() {
        assert_eq!(quote_etag("abc"), "\"abc\"");
        assert_eq!(quote_etag("\"abc\""), "\"abc\"");
        assert_eq!(quote_etag("W/\"abc\""), "W/\"abc\"");
    }

    #[test]
    fn attributes_serialize_sparsely() {
        let attrs = ObjectAttributes::with_content_type("video/mp4");
        assert_eq!(
            serde_json::to_string(&attrs).unwrap(),
            r#"{"content_type":"video/mp4"}"#
        );
        assert!(ObjectAttributes::default().is_empty());
        assert!(!attrs.is_empty());
    }
}
