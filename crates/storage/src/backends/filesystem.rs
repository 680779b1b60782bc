//! Local filesystem storage backend.
//!
//! Objects live at `<root>/<key>`. HTTP attributes are kept in a JSON
//! sidecar at `<root>/.attrs/<key>.json` so the object files themselves stay
//! byte-identical to what was uploaded.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, GetResult, ObjectAttributes, ObjectMeta, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use reelgate_core::ByteRange;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;

/// Default chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Directory under the root holding attribute sidecars.
const ATTRS_DIR: &str = ".attrs";

/// Local filesystem object store.
#[derive(Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
}

fn not_found_or_io(err: std::io::Error, key: &str) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(err)
    }
}

/// Sibling temp path for an atomic write to `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    let suffix = format!(".tmp.{}", Uuid::new_v4());
    let name = path
        .file_name()
        .map(|n| format!("{}{suffix}", n.to_string_lossy()))
        .unwrap_or(suffix);
    path.with_file_name(name)
}

fn etag_for(metadata: &std::fs::Metadata) -> String {
    let mtime_nanos = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());
    format!("\"{:x}-{:x}\"", metadata.len(), mtime_nanos)
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Canonicalization and `symlink_metadata` block, so they run on the
    /// blocking pool.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Resolve `key` under `root`, refusing anything that would land outside
    /// it, including through symlinks on the existing part of the path.
    fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!("unsafe key: {key:?}")));
        }

        let mut components = Path::new(key).components();
        match components.next() {
            Some(Component::Normal(first)) if first != ATTRS_DIR => {}
            _ => {
                return Err(StorageError::InvalidKey(format!("unsafe key: {key:?}")));
            }
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(StorageError::InvalidKey(format!(
                "contains unsafe path component: {key}"
            )));
        }

        let path = root.join(key);
        let root_canonical = root.canonicalize()?;

        // Nearest existing ancestor (the path itself when it exists) must
        // resolve inside the root.
        let mut probe = Some(path.as_path());
        while let Some(candidate) = probe {
            match std::fs::symlink_metadata(candidate) {
                Ok(meta) => {
                    let resolved = candidate.canonicalize().map_err(|e| {
                        if meta.file_type().is_symlink() {
                            StorageError::InvalidKey(format!("dangling symlink in key: {key}"))
                        } else {
                            StorageError::Io(e)
                        }
                    })?;
                    if !resolved.starts_with(&root_canonical) {
                        return Err(StorageError::InvalidKey(format!(
                            "resolved path escapes storage root: {key}"
                        )));
                    }
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    probe = candidate.parent();
                }
                Err(e) => return Err(StorageError::Io(e)),
            }
        }

        Ok(path)
    }

    fn attrs_path(&self, key: &str) -> PathBuf {
        self.root.join(ATTRS_DIR).join(format!("{key}.json"))
    }

    async fn read_attributes(&self, key: &str) -> StorageResult<ObjectAttributes> {
        match fs::read(self.attrs_path(key)).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| StorageError::CorruptAttributes {
                key: key.to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ObjectAttributes::default()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_attributes(&self, key: &str, attributes: &ObjectAttributes) -> StorageResult<()> {
        let path = self.attrs_path(key);
        if attributes.is_empty() {
            return match fs::remove_file(&path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(StorageError::Io(e)),
                _ => Ok(()),
            };
        }

        let json = serde_json::to_vec(attributes).map_err(|e| StorageError::CorruptAttributes {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        ensure_parent(&path).await?;
        let temp = temp_path_for(&path);
        fs::write(&temp, json).await?;
        fs::rename(&temp, &path).await?;
        Ok(())
    }

    /// Open a regular file, mapping a missing file or a directory to NotFound.
    async fn open_object(&self, key: &str) -> StorageResult<(fs::File, ObjectMeta)> {
        let path = self.key_path(key).await?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(e, key))?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let meta = self.build_meta(key, &metadata).await?;
        Ok((file, meta))
    }

    async fn build_meta(&self, key: &str, metadata: &std::fs::Metadata) -> StorageResult<ObjectMeta> {
        Ok(ObjectMeta {
            size: metadata.len(),
            etag: etag_for(metadata),
            last_modified: metadata.modified().ok().map(Into::into),
            attributes: self.read_attributes(key).await?,
        })
    }
}

async fn ensure_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn read_limited(file: fs::File, length: u64) -> ByteStream {
    let stream = async_stream::try_stream! {
        let mut reader = file.take(length);
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buf[..n]);
        }
    };
    Box::pin(stream)
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(e, key))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        self.build_meta(key, &metadata).await
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str, range: Option<ByteRange>) -> StorageResult<GetResult> {
        let (mut file, meta) = self.open_object(key).await?;

        let served = match range {
            Some(range) => Some(
                range
                    .resolve(meta.size)
                    .ok_or(StorageError::RangeNotSatisfiable { size: meta.size })?,
            ),
            None => None,
        };

        let (offset, length) = served.map_or((0, meta.size), |r| (r.offset, r.length));
        if offset > 0 {
            file.seek(std::io::SeekFrom::Start(offset)).await?;
        }

        Ok(GetResult {
            meta,
            range: served,
            body: read_limited(file, length),
        })
    }

    #[instrument(skip(self, data, attributes), fields(backend = "filesystem", size = data.len()))]
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        attributes: &ObjectAttributes,
    ) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        ensure_parent(&path).await?;

        let temp_path = temp_path_for(&path);
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        self.write_attributes(key, attributes).await
    }

    #[instrument(skip(self, attributes), fields(backend = "filesystem"))]
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        attributes: &ObjectAttributes,
    ) -> StorageResult<u64> {
        let path = self.key_path(key).await?;
        ensure_parent(&path).await?;

        let temp_path = temp_path_for(&path);
        let copied = match fs::copy(source, &temp_path).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::Io(e));
            }
        };
        fs::File::open(&temp_path).await?.sync_all().await?;
        fs::rename(&temp_path, &path).await?;

        self.write_attributes(key, attributes).await?;
        Ok(copied)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {}",
                self.root.display()
            )));
        }
        Ok(())
    }
}
