//! S3-compatible storage backend (AWS S3, Cloudflare R2, MinIO).

use crate::error::{StorageError, StorageResult};
use crate::traits::{GetResult, ObjectAttributes, ObjectMeta, ObjectStore, quote_etag};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::{ByteStream as S3ByteStream, DateTime};
use bytes::Bytes;
use futures::StreamExt;
use reelgate_core::{ByteRange, ServedRange};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::instrument;

/// Read buffer for streamed object bodies (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// S3-compatible object store using AWS SDK.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    endpoint: Option<String>,
    region: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Add `http://` to bare `host:port` endpoints such as `minio:9000`.
fn normalize_endpoint(endpoint: &str) -> String {
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

/// Parse `bytes {first}-{last}/{total}` from a `Content-Range` response header.
fn parse_content_range(value: &str) -> Option<(ServedRange, u64)> {
    let rest = value.trim().strip_prefix("bytes ")?;
    let (span, total) = rest.split_once('/')?;
    let (first, last) = span.split_once('-')?;
    let (first, last, total): (u64, u64, u64) =
        (first.parse().ok()?, last.parse().ok()?, total.parse().ok()?);
    if last < first || last >= total {
        return None;
    }
    Some((
        ServedRange {
            offset: first,
            length: last - first + 1,
        },
        total,
    ))
}

fn service_status<E>(err: &SdkError<E>) -> Option<u16> {
    match err {
        SdkError::ServiceError(service_err) => Some(service_err.raw().status().as_u16()),
        _ => None,
    }
}

fn to_offset_datetime(key: &str, dt: Option<&DateTime>) -> Option<time::OffsetDateTime> {
    let dt = dt?;
    time::OffsetDateTime::from_unix_timestamp(dt.secs())
        .inspect_err(|e| {
            tracing::warn!(key = %key, timestamp = dt.secs(), error = %e, "Unrepresentable S3 timestamp");
        })
        .ok()
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// Without explicit keys the ambient AWS credential chain is used
    /// (environment, profile, instance role).
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        prefix: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        let region = region.unwrap_or_else(|| "us-east-1".to_string());

        let mut builder = match (access_key_id, secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials =
                    aws_sdk_s3::config::Credentials::new(key_id, secret, None, None, "reelgate-config");
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(aws_config::Region::new(region.clone()))
                    .credentials_provider(credentials)
            }
            (None, None) => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(aws_config::Region::new(region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
            _ => {
                return Err(StorageError::Config(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ));
            }
        };

        let endpoint = endpoint.as_deref().map(normalize_endpoint);
        if let Some(url) = &endpoint {
            builder = builder.endpoint_url(url);
        }
        if force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            prefix: prefix
                .map(|p| p.trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty()),
            endpoint,
            region,
        })
    }

    /// Get the full object key for a key (applies prefix if configured).
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }

    /// Convert an AWS SDK error to StorageError, mapping 404 to NotFound.
    fn map_sdk_error<E>(err: SdkError<E>, key: &str) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if service_status(&err) == Some(404) {
            return StorageError::NotFound(key.to_string());
        }
        StorageError::S3(Box::new(err))
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        Ok(ObjectMeta {
            size: output.content_length().unwrap_or(0).max(0) as u64,
            etag: quote_etag(output.e_tag().unwrap_or_default()),
            last_modified: to_offset_datetime(key, output.last_modified()),
            attributes: ObjectAttributes {
                content_type: output.content_type().map(str::to_string),
                content_disposition: output.content_disposition().map(str::to_string),
                content_encoding: output.content_encoding().map(str::to_string),
            },
        })
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, key: &str, range: Option<ByteRange>) -> StorageResult<GetResult> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .set_range(range.map(|r| r.to_string()))
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if service_status(&err) == Some(416) => {
                let size = self.head(key).await?.size;
                return Err(StorageError::RangeNotSatisfiable { size });
            }
            Err(err) => return Err(Self::map_sdk_error(err, key)),
        };

        let content_length = output.content_length().unwrap_or(0).max(0) as u64;
        let (size, served) = match output.content_range().and_then(parse_content_range) {
            Some((served, total)) => (total, Some(served)),
            None => (content_length, None),
        };

        let meta = ObjectMeta {
            size,
            etag: quote_etag(output.e_tag().unwrap_or_default()),
            last_modified: to_offset_datetime(key, output.last_modified()),
            attributes: ObjectAttributes {
                content_type: output.content_type().map(str::to_string),
                content_disposition: output.content_disposition().map(str::to_string),
                content_encoding: output.content_encoding().map(str::to_string),
            },
        };

        // Dropping the stream drops the SDK body, which aborts the transfer.
        let reader = ReaderStream::with_capacity(output.body.into_async_read(), STREAM_CHUNK_SIZE);
        let body = reader.map(|chunk| chunk.map_err(StorageError::Io));

        Ok(GetResult {
            meta,
            range: served,
            body: Box::pin(body),
        })
    }

    #[instrument(skip(self, data, attributes), fields(backend = "s3", size = data.len()))]
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        attributes: &ObjectAttributes,
    ) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .body(S3ByteStream::from(data))
            .set_content_type(attributes.content_type.clone())
            .set_content_disposition(attributes.content_disposition.clone())
            .set_content_encoding(attributes.content_encoding.clone())
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;
        Ok(())
    }

    /// Single PUT of the whole file. S3 caps a single PUT at 5 GiB.
    #[instrument(skip(self, attributes), fields(backend = "s3"))]
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        attributes: &ObjectAttributes,
    ) -> StorageResult<u64> {
        let size = tokio::fs::metadata(source).await?.len();
        let body = S3ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .body(body)
            .content_length(i64::try_from(size).unwrap_or(i64::MAX))
            .set_content_type(attributes.content_type.clone())
            .set_content_disposition(attributes.content_disposition.clone())
            .set_content_encoding(attributes.content_encoding.clone())
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;
        Ok(size)
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let probe = self.client.head_bucket().bucket(&self.bucket).send();
        tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe)
            .await
            .map_err(|_| {
                StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "S3 health check timed out after 10 seconds",
                ))
            })?
            .map_err(|e| StorageError::S3(Box::new(e)))?;
        Ok(())
    }
}
