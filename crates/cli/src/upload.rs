//! `reelgatectl upload`: push local video files into object storage.
//!
//! Batch mode walks a folder, turns every video file into an [`UploadJob`],
//! and drains the job queue with a fixed number of workers. Each worker pops
//! from the shared queue under a mutex, so every job is claimed exactly once.
//! Results are collected after all workers have been joined.

use anyhow::{Context, Result};
use reelgate_core::{content_type_for, is_video_file};
use reelgate_storage::{ObjectAttributes, ObjectStore};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use walkdir::WalkDir;

/// A file to upload and the key to store it under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadJob {
    pub source: PathBuf,
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { bytes: u64 },
    Skipped,
    Failed(String),
}

/// Aggregate result of a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_bytes: u64,
    /// `(key, error)` for every failed job.
    pub failures: Vec<(String, String)>,
}

impl UploadSummary {
    pub fn record(&mut self, job: &UploadJob, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded { bytes } => {
                self.uploaded += 1;
                self.total_bytes += bytes;
            }
            UploadOutcome::Skipped => self.skipped += 1,
            UploadOutcome::Failed(error) => {
                self.failed += 1;
                self.failures.push((job.key.clone(), error.clone()));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.uploaded + self.skipped + self.failed
    }

    pub fn render(&self) -> String {
        format!(
            "Upload summary:\n  Uploaded: {}\n  Skipped:  {}\n  Failed:   {}\n  Total:    {:.2} MB\n",
            self.uploaded,
            self.skipped,
            self.failed,
            self.total_bytes as f64 / 1024.0 / 1024.0
        )
    }
}

/// Every video file under `dir`, sorted. Symlinks are not followed.
pub fn collect_video_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to scan {}", dir.display()))?;
        if entry.file_type().is_file() && is_video_file(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// `prefix` + path of `file` relative to `root`, with `/` separators.
pub fn object_key(root: &Path, file: &Path, prefix: &str) -> Result<String> {
    let relative = file.strip_prefix(root).with_context(|| {
        format!("{} is not under {}", file.display(), root.display())
    })?;
    let relative = relative.to_string_lossy().replace('\\', "/");
    Ok(format!("{prefix}{relative}"))
}

/// Jobs for every video file under `root`.
pub fn plan_jobs(root: &Path, prefix: &str) -> Result<Vec<UploadJob>> {
    collect_video_files(root)?
        .into_iter()
        .map(|source| {
            let key = object_key(root, &source, prefix)?;
            Ok(UploadJob { source, key })
        })
        .collect()
}

/// Upload one file. Never retries.
pub async fn upload_one(store: &dyn ObjectStore, job: &UploadJob, skip_existing: bool) -> UploadOutcome {
    // Not atomic: another writer may create the key between this check and the put.
    if skip_existing {
        match store.exists(&job.key).await {
            Ok(true) => return UploadOutcome::Skipped,
            Ok(false) => {}
            Err(e) => return UploadOutcome::Failed(e.to_string()),
        }
    }

    let attributes = ObjectAttributes::with_content_type(content_type_for(&job.key));
    match store.put_file(&job.key, &job.source, &attributes).await {
        Ok(bytes) => UploadOutcome::Uploaded { bytes },
        Err(e) => UploadOutcome::Failed(e.to_string()),
    }
}

fn report(job: &UploadJob, outcome: &UploadOutcome) {
    match outcome {
        UploadOutcome::Uploaded { bytes } => println!("Uploaded: {} ({bytes} bytes)", job.key),
        UploadOutcome::Skipped => println!("Skipped existing: {}", job.key),
        UploadOutcome::Failed(error) => eprintln!("Upload failed: {}: {error}", job.key),
    }
}

/// Upload `jobs` with `concurrency` workers (at least one).
pub async fn run_batch(
    store: Arc<dyn ObjectStore>,
    jobs: Vec<UploadJob>,
    concurrency: usize,
    skip_existing: bool,
) -> UploadSummary {
    let workers = concurrency.max(1).min(jobs.len().max(1));
    let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let queue = queue.clone();
            let store = store.clone();
            tokio::spawn(async move {
                let mut results = Vec::new();
                loop {
                    let Some(job) = queue.lock().await.pop_front() else {
                        break;
                    };
                    let outcome = upload_one(store.as_ref(), &job, skip_existing).await;
                    tracing::debug!(worker, key = %job.key, outcome = ?outcome, "upload finished");
                    report(&job, &outcome);
                    results.push((job, outcome));
                }
                results
            })
        })
        .collect();

    let mut summary = UploadSummary::default();
    for handle in handles {
        match handle.await {
            Ok(results) => {
                for (job, outcome) in &results {
                    summary.record(job, outcome);
                }
            }
            Err(e) => tracing::error!(error = %e, "upload worker panicked"),
        }
    }
    summary
}
