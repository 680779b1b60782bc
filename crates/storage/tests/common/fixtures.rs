use bytes::Bytes;
use futures::TryStreamExt;
use reelgate_storage::{FilesystemBackend, GetResult, ObjectAttributes, ObjectStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Generate deterministic test data using a seeded pseudo-random generator.
/// Same seed produces same output.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// A filesystem store in a temp dir seeded with `objects`.
#[allow(dead_code)]
pub async fn seeded_store(objects: &[(&str, Bytes)]) -> (TempDir, Arc<dyn ObjectStore>) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let store: Arc<dyn ObjectStore> = Arc::new(
        FilesystemBackend::new(dir.path())
            .await
            .expect("Failed to create storage backend"),
    );
    for (key, data) in objects {
        store
            .put(key, data.clone(), &ObjectAttributes::default())
            .await
            .expect("Failed to seed object");
    }
    (dir, store)
}

/// Drain a read into memory.
#[allow(dead_code)]
pub async fn read_all(result: GetResult) -> Vec<u8> {
    let chunks: Vec<Bytes> = result.body.try_collect().await.expect("stream failed");
    chunks.concat()
}
