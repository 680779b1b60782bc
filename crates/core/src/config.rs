//! Configuration types shared across crates.
//!
//! Loaded once at startup (TOML file merged with `REELGATE_*` environment
//! variables) and then treated as immutable.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Placeholder values shipped in example configs. Seeing one of these at
/// runtime means the operator never set the real value.
pub const PLACEHOLDER_BASE_URL: &str = "https://your-worker.workers.dev";
pub const PLACEHOLDER_SECRET: &str = "your-secret-key-change-this";

/// Secrets shorter than this are reported as weak.
const MIN_SECRET_LEN: usize = 16;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Name reported by the health endpoint.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Route `/metrics` to a Prometheus exposition (default: false).
    /// When enabled, an object stored under the key `metrics` is no longer
    /// reachable through the proxy.
    #[serde(default)]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_service_name() -> String {
    "reelgate".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            service_name: default_service_name(),
            metrics_enabled: false,
        }
    }
}

/// Access control configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Shared HMAC secret. When unset, signature checks are skipped entirely.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Referer host allow-list. Accepts a list or a comma-separated string.
    #[serde(default, deserialize_with = "deserialize_domain_list")]
    pub allowed_referers: Vec<String>,
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("allowed_referers", &self.allowed_referers)
            .finish()
    }
}

impl AccessConfig {
    /// Secret to sign with, if configured and non-empty.
    pub fn secret(&self) -> Option<&str> {
        self.secret_key.as_deref().filter(|s| !s.is_empty())
    }

    /// Normalized allow-list: trimmed, lowercased, empty entries dropped.
    pub fn referer_allow_list(&self) -> Vec<String> {
        normalize_domains(self.allowed_referers.iter().map(String::as_str))
    }

    /// Check for insecure settings. Returns warnings; none of them is fatal.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self.secret() {
            None => warnings.push(
                "access.secret_key is not set: signature checks are disabled and every object is publicly readable"
                    .to_string(),
            ),
            Some(secret) if secret.contains("change-this") => warnings.push(
                "access.secret_key is still the placeholder value; set REELGATE_ACCESS__SECRET_KEY"
                    .to_string(),
            ),
            Some(secret) if secret.len() < MIN_SECRET_LEN => warnings.push(format!(
                "access.secret_key is shorter than {MIN_SECRET_LEN} bytes; links can be brute-forced"
            )),
            Some(_) => {}
        }
        warnings
    }
}

fn normalize_domains<'a>(entries: impl Iterator<Item = &'a str>) -> Vec<String> {
    entries
        .flat_map(|entry| entry.split(','))
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

fn deserialize_domain_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DomainList {
        Csv(String),
        List(Vec<String>),
    }

    Ok(match DomainList::deserialize(deserializer)? {
        DomainList::Csv(s) => normalize_domains(std::iter::once(s.as_str())),
        DomainList::List(items) => normalize_domains(items.iter().map(String::as_str)),
    })
}

/// Link issuance configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Public base URL of the proxy, used when building signed links.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default link lifetime in seconds.
    #[serde(default = "default_link_ttl_secs")]
    pub default_ttl_secs: u64,
}

fn default_link_ttl_secs() -> u64 {
    3600
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_ttl_secs: default_link_ttl_secs(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage (AWS S3, Cloudflare R2, MinIO).
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL, e.g. `https://<account>.r2.cloudflarestorage.com`.
        endpoint: Option<String>,
        /// Region. R2 uses "auto".
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// Access key ID. Falls back to the ambient AWS credential chain if unset.
        access_key_id: Option<String>,
        /// Secret access key. Falls back to the ambient AWS credential chain if unset.
        secret_access_key: Option<String>,
        /// Use path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err(crate::Error::Config("s3 bucket must not be empty".to_string()));
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(crate::Error::Config(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    )),
                }
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Batch upload configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Number of files transferred at once.
    #[serde(default = "default_upload_concurrency")]
    pub concurrency: usize,
    /// Key prefix for batch uploads.
    #[serde(default = "default_upload_prefix")]
    pub prefix: String,
    /// Skip files whose key already exists in storage.
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
}

fn default_upload_concurrency() -> usize {
    3
}

fn default_upload_prefix() -> String {
    "video/".to_string()
}

fn default_skip_existing() -> bool {
    true
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_upload_concurrency(),
            prefix: default_upload_prefix(),
            skip_existing: default_skip_existing(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Create a test configuration: open access, filesystem storage.
    pub fn for_testing() -> Self {
        Self::default()
    }

    /// Collect configuration warnings across sections.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.access.validate();
        if self.upload.concurrency == 0 {
            warnings.push("upload.concurrency is 0; one worker will be used".to_string());
        }
        if let Some(base_url) = &self.link.base_url
            && base_url.contains("your-worker")
        {
            warnings.push("link.base_url is still the placeholder value".to_string());
        }
        warnings
    }
}
