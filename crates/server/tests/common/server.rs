//! Server test utilities.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use bytes::Bytes;
use reelgate_core::config::{AppConfig, StorageConfig};
use reelgate_core::{Clock, FixedClock};
use reelgate_server::{AppState, create_router};
use reelgate_signer::{SecretKey, sign};
use reelgate_storage::{FilesystemBackend, ObjectAttributes, ObjectStore};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Frozen "now" for every test server: 2023-11-14T22:13:20Z.
#[allow(dead_code)]
pub const TEST_NOW: i64 = 1_700_000_000;

#[allow(dead_code)]
pub const TEST_SECRET: &str = "test-secret-0123456789";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Open-mode server (no secret, no allow-list) over temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Server with the test secret configured.
    pub async fn signed() -> Self {
        Self::with_config(|config| {
            config.access.secret_key = Some(TEST_SECRET.to_string());
        })
        .await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let storage_path = temp_dir.path().join("storage");
        std::fs::create_dir_all(&storage_path).expect("Failed to create storage directory");
        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );

        let mut config = AppConfig {
            storage: StorageConfig::Filesystem { path: storage_path },
            ..AppConfig::for_testing()
        };
        modifier(&mut config);

        let clock = Arc::new(FixedClock::new(TEST_NOW));
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let state =
            AppState::new(config, storage, shared_clock).expect("Failed to create app state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            clock,
            _temp_dir: temp_dir,
        }
    }

    /// Store an object directly in the backing store.
    pub async fn put_object(&self, key: &str, data: impl Into<Bytes>) {
        self.put_object_with(key, data, &ObjectAttributes::default())
            .await;
    }

    pub async fn put_object_with(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        attributes: &ObjectAttributes,
    ) {
        self.state
            .storage
            .put(key, data.into(), attributes)
            .await
            .expect("Failed to store object");
    }

    /// Root directory of the filesystem backend.
    pub fn storage_root(&self) -> std::path::PathBuf {
        match &self.state.config.storage {
            StorageConfig::Filesystem { path } => path.clone(),
            other => panic!("test server uses filesystem storage, got {other:?}"),
        }
    }

    /// Request URI for `path` signed with the test secret.
    pub fn signed_uri(&self, path: &str, expires: i64) -> String {
        let key = SecretKey::new(TEST_SECRET).expect("valid secret");
        format!(
            "/{path}?expires={expires}&signature={}",
            sign(path, expires, &key)
        )
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// GET `uri` with extra headers.
    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> Response {
        self.request("GET", uri, headers).await
    }

    pub async fn request(&self, method: &str, uri: &str, headers: &[(&str, &str)]) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).expect("valid request"))
            .await
    }
}
