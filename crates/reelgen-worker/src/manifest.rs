//! Durable batch manifest storage.
//!
//! The manifest is the single source of truth for batch progress. It is
//! rewritten atomically (temp file plus rename) after every recorded
//! transition, so a run killed at any point resumes from the last
//! persisted state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use reelgen_models::{BatchManifest, JobState};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// File-backed manifest store with atomic writes.
pub struct ManifestStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the manifest from disk.
    pub async fn load(&self) -> Result<BatchManifest, ManifestError> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load an existing manifest, or persist and return `fresh` when the
    /// file does not exist yet.
    pub async fn load_or_create(
        &self,
        fresh: BatchManifest,
    ) -> Result<BatchManifest, ManifestError> {
        if self.exists() {
            let manifest = self.load().await?;
            debug!(
                batch_id = %manifest.batch_id,
                path = %self.path.display(),
                "resuming from existing manifest"
            );
            return Ok(manifest);
        }
        self.save(&fresh).await?;
        Ok(fresh)
    }

    /// Persist the manifest.
    ///
    /// Writes to a sibling temp file and renames over the target, so a
    /// crash mid-write never leaves a truncated manifest behind.
    pub async fn save(&self, manifest: &BatchManifest) -> Result<(), ManifestError> {
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(manifest)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Receiver for job state updates as the pipeline progresses.
///
/// The pipeline calls this after every stage transition; implementations
/// decide whether and where the state is persisted.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn record(&self, state: &JobState) -> Result<(), ManifestError>;
}

/// Sink that folds each update into a shared manifest and persists it.
pub struct ManifestSink {
    manifest: Arc<Mutex<BatchManifest>>,
    store: Arc<ManifestStore>,
}

impl ManifestSink {
    pub fn new(manifest: Arc<Mutex<BatchManifest>>, store: Arc<ManifestStore>) -> Self {
        Self { manifest, store }
    }
}

#[async_trait]
impl ProgressSink for ManifestSink {
    async fn record(&self, state: &JobState) -> Result<(), ManifestError> {
        let mut manifest = self.manifest.lock().await;
        manifest.record(state.clone());
        self.store.save(&manifest).await
    }
}

/// Sink that drops every update. Used by tests and one-off runs that do
/// not need durable state.
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn record(&self, _state: &JobState) -> Result<(), ManifestError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_models::{BatchId, JobSpec, Stage};

    fn manifest_with_specs(titles: &[&str]) -> BatchManifest {
        let specs = titles
            .iter()
            .map(|t| JobSpec::new(*t, "script", "default"))
            .collect();
        BatchManifest::new(BatchId::from_string("batch-1"), specs)
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path().join("batch.json"));

        let mut manifest = manifest_with_specs(&["a", "b"]);
        let job_id = manifest.specs[0].id.clone();
        let mut state = manifest.state_or_default(&job_id);
        state.advance(Stage::GeneratingAssets);
        state.begin_attempt(Stage::GeneratingAssets);
        manifest.record(state);

        store.save(&manifest).await.unwrap();
        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded, manifest);
        assert_eq!(
            reloaded.states[&job_id].stage,
            Stage::GeneratingAssets
        );
    }

    #[tokio::test]
    async fn load_or_create_prefers_the_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path().join("batch.json"));

        let first = manifest_with_specs(&["a"]);
        let created = store.load_or_create(first.clone()).await.unwrap();
        assert_eq!(created.batch_id, first.batch_id);
        assert!(store.exists());

        // A second call with a different manifest must return the
        // persisted one, not overwrite it.
        let second = manifest_with_specs(&["x", "y", "z"]);
        let resumed = store.load_or_create(second).await.unwrap();
        assert_eq!(resumed.specs.len(), 1);
        assert_eq!(resumed.batch_id, first.batch_id);
    }

    #[tokio::test]
    async fn sink_persists_every_recorded_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ManifestStore::new(dir.path().join("batch.json")));

        let manifest = manifest_with_specs(&["a"]);
        let job_id = manifest.specs[0].id.clone();
        store.save(&manifest).await.unwrap();

        let shared = Arc::new(Mutex::new(manifest));
        let sink = ManifestSink::new(shared.clone(), store.clone());

        let mut state = shared.lock().await.state_or_default(&job_id);
        state.advance(Stage::GeneratingAssets);
        sink.record(&state).await.unwrap();
        state.advance(Stage::AligningSubtitles);
        sink.record(&state).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.states[&job_id].stage, Stage::AligningSubtitles);
        assert_eq!(reloaded.states[&job_id].transitions.len(), 2);
    }

    #[tokio::test]
    async fn no_temp_file_is_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path().join("batch.json"));
        store.save(&manifest_with_specs(&["a"])).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("batch.json")]);
    }
}
