//! Batch manifest: ordered job specs plus persisted per-job state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::job::{JobId, JobSpec, JobState, Stage};

/// Unique identifier for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome counts for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    pub incomplete: usize,
}

impl BatchSummary {
    /// True when every job finished and none failed.
    pub fn is_success(&self) -> bool {
        self.incomplete == 0 && self.failed == 0
    }

    /// True when every job reached a terminal stage.
    pub fn is_complete(&self) -> bool {
        self.incomplete == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} jobs: {} done, {} failed, {} incomplete",
            self.total, self.done, self.failed, self.incomplete
        )
    }
}

/// Ordered list of job specs plus a map of job id to pipeline state.
///
/// Created at batch start or loaded from a prior partial run; updated
/// after every stage transition; retained until every job is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchManifest {
    pub batch_id: BatchId,
    /// Ordered job specifications
    pub specs: Vec<JobSpec>,
    /// Job id -> current pipeline state
    #[serde(default)]
    pub states: BTreeMap<JobId, JobState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchManifest {
    pub fn new(batch_id: BatchId, specs: Vec<JobSpec>) -> Self {
        let now = Utc::now();
        Self {
            batch_id,
            specs,
            states: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// State for a job, creating a fresh `Pending` one if absent.
    pub fn state_or_default(&mut self, job_id: &JobId) -> JobState {
        self.states
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| JobState::new(job_id.clone()))
    }

    /// Upsert a job state after a transition.
    pub fn record(&mut self, state: JobState) {
        self.updated_at = Utc::now();
        self.states.insert(state.job_id.clone(), state);
    }

    /// Specs whose job has not reached a terminal stage, in batch order.
    pub fn incomplete_specs(&self) -> Vec<&JobSpec> {
        self.specs
            .iter()
            .filter(|spec| {
                self.states
                    .get(&spec.id)
                    .map(|s| !s.is_terminal())
                    .unwrap_or(true)
            })
            .collect()
    }

    /// True when every job reached `done` or `failed`.
    pub fn is_complete(&self) -> bool {
        self.incomplete_specs().is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.specs.len(),
            ..Default::default()
        };
        for spec in &self.specs {
            match self.states.get(&spec.id).map(|s| s.stage) {
                Some(Stage::Done) => summary.done += 1,
                Some(Stage::Failed) => summary.failed += 1,
                _ => summary.incomplete += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ErrorKind, JobError};

    fn spec(title: &str) -> JobSpec {
        JobSpec::new(title, "script text", "default")
    }

    #[test]
    fn summary_counts_outcomes() {
        let specs = vec![spec("a"), spec("b"), spec("c")];
        let mut manifest = BatchManifest::new(BatchId::new(), specs.clone());

        let mut done = JobState::new(specs[0].id.clone());
        done.advance(Stage::Done);
        manifest.record(done);

        let mut failed = JobState::new(specs[1].id.clone());
        failed.fail(JobError::new(ErrorKind::Render, "boom"));
        manifest.record(failed);

        let summary = manifest.summary();
        assert_eq!(summary.done, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.incomplete, 1);
        assert!(!summary.is_success());
        assert!(!manifest.is_complete());

        assert_eq!(manifest.incomplete_specs().len(), 1);
        assert_eq!(manifest.incomplete_specs()[0].id, specs[2].id);
    }

    #[test]
    fn manifest_serde_roundtrip_preserves_states() {
        let specs = vec![spec("a"), spec("b")];
        let mut manifest = BatchManifest::new(BatchId::from_string("batch-1"), specs.clone());

        let mut state = JobState::new(specs[0].id.clone());
        state.advance(Stage::GeneratingAssets);
        state.begin_attempt(Stage::GeneratingAssets);
        state.begin_attempt(Stage::GeneratingAssets);
        manifest.record(state);

        let json = serde_json::to_string_pretty(&manifest).expect("serialize manifest");
        let decoded: BatchManifest = serde_json::from_str(&json).expect("deserialize manifest");

        assert_eq!(decoded, manifest);
        let reloaded = &decoded.states[&specs[0].id];
        assert_eq!(reloaded.stage, Stage::GeneratingAssets);
        assert_eq!(reloaded.attempts_for(Stage::GeneratingAssets), 2);
    }
}
