//! Job specification and per-job pipeline state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::account::AccountId;
use crate::asset::AssetRef;
use crate::subtitle::SubtitleCue;
use crate::timeline::Timeline;
use crate::upload::{UploadMetadata, UploadResult};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage of a job.
///
/// Stages execute strictly in order within a job; `Done` and `Failed` are
/// terminal and accept no further transitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Pending,
    GeneratingAssets,
    AligningSubtitles,
    Composing,
    Rendering,
    Uploading,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::GeneratingAssets => "generating_assets",
            Stage::AligningSubtitles => "aligning_subtitles",
            Stage::Composing => "composing",
            Stage::Rendering => "rendering",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error category recorded on job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Generation,
    Alignment,
    Composition,
    Render,
    Auth,
    Upload,
    NoAccount,
    Interrupted,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Generation => "generation",
            ErrorKind::Alignment => "alignment",
            ErrorKind::Composition => "composition",
            ErrorKind::Render => "render",
            ErrorKind::Auth => "auth",
            ErrorKind::Upload => "upload",
            ErrorKind::NoAccount => "no_account",
            ErrorKind::Interrupted => "interrupted",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error kind and message attached to a failed stage or job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// One recorded stage transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// Immutable specification of one video job.
///
/// Created by the caller (single run or batch reader) and never mutated;
/// all mutable progress lives on [`JobState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Unique job ID
    pub id: JobId,
    /// Output/video title
    pub title: String,
    /// Script or prompt text narrated over the video
    pub script: String,
    /// Style/preset identifier resolved by the generation backends
    pub preset: String,
    /// Target video duration in seconds, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_secs: Option<f64>,
    /// Number of visual segments to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_count: Option<usize>,
    /// Background music selection (library key or path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,
    /// Listing metadata for the upload stage
    pub upload: UploadMetadata,
    /// Preferred upload account, tried first when eligible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountId>,
}

impl JobSpec {
    pub fn new(
        title: impl Into<String>,
        script: impl Into<String>,
        preset: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            id: JobId::new(),
            upload: UploadMetadata::new(title.clone()),
            title,
            script: script.into(),
            preset: preset.into(),
            target_secs: None,
            visual_count: None,
            music: None,
            account: None,
        }
    }

    /// Set the target duration.
    pub fn with_target_secs(mut self, secs: f64) -> Self {
        self.target_secs = Some(secs);
        self
    }

    /// Set the number of visual segments.
    pub fn with_visual_count(mut self, count: usize) -> Self {
        self.visual_count = Some(count);
        self
    }

    /// Set the background music selection.
    pub fn with_music(mut self, music: impl Into<String>) -> Self {
        self.music = Some(music.into());
        self
    }

    /// Set upload listing metadata.
    pub fn with_upload(mut self, upload: UploadMetadata) -> Self {
        self.upload = upload;
        self
    }

    /// Set the preferred upload account.
    pub fn with_account(mut self, account: AccountId) -> Self {
        self.account = Some(account);
        self
    }
}

/// Narration audio reference with its known duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationAsset {
    pub asset: AssetRef,
    pub duration_secs: f64,
}

/// Mutable per-job pipeline state.
///
/// Owned exclusively by the pipeline runner for that job; one state per
/// spec. Carries the stage outputs needed to resume at the first
/// incomplete stage: asset references and small timing values only, never
/// media content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: JobId,
    pub stage: Stage,
    /// Narration audio and duration (generating_assets output)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<NarrationAsset>,
    /// Generated visual assets, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visuals: Vec<AssetRef>,
    /// Generated subtitle text asset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_text: Option<AssetRef>,
    /// Background music asset, when selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<AssetRef>,
    /// Timed caption cues (aligning_subtitles output)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<SubtitleCue>,
    /// Composed timeline (composing output)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    /// Rendered video artifact (rendering output)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<AssetRef>,
    /// Upload outcome (uploading output)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadResult>,
    /// Attempt counters per stage
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attempts: BTreeMap<Stage, u32>,
    /// Most recent error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<JobError>,
    /// Full transition history with timestamps
    #[serde(default)]
    pub transitions: Vec<StageTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobState {
    pub fn new(job_id: JobId) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            stage: Stage::Pending,
            narration: None,
            visuals: Vec::new(),
            subtitle_text: None,
            music: None,
            cues: Vec::new(),
            timeline: None,
            video: None,
            upload: None,
            attempts: BTreeMap::new(),
            last_error: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to the next stage, recording the transition.
    ///
    /// Transitions out of a terminal stage are ignored.
    pub fn advance(&mut self, to: Stage) {
        if self.is_terminal() {
            return;
        }
        let now = Utc::now();
        self.transitions.push(StageTransition {
            from: self.stage,
            to,
            at: now,
            error: None,
        });
        self.stage = to;
        self.updated_at = now;
    }

    /// Fail the job, recording the error on the terminal transition.
    pub fn fail(&mut self, error: JobError) {
        if self.is_terminal() {
            return;
        }
        let now = Utc::now();
        self.transitions.push(StageTransition {
            from: self.stage,
            to: Stage::Failed,
            at: now,
            error: Some(error.clone()),
        });
        self.stage = Stage::Failed;
        self.last_error = Some(error);
        self.updated_at = now;
    }

    /// Record a same-stage retry (e.g. `uploading -> uploading` on a
    /// rate-limit response) with the error that caused it.
    pub fn record_retry(&mut self, error: JobError) {
        let now = Utc::now();
        self.transitions.push(StageTransition {
            from: self.stage,
            to: self.stage,
            at: now,
            error: Some(error.clone()),
        });
        self.last_error = Some(error);
        self.updated_at = now;
    }

    /// Increment and return the attempt count for a stage.
    pub fn begin_attempt(&mut self, stage: Stage) -> u32 {
        let count = self.attempts.entry(stage).or_insert(0);
        *count += 1;
        self.updated_at = Utc::now();
        *count
    }

    /// Attempts made for a stage so far.
    pub fn attempts_for(&self, stage: Stage) -> u32 {
        self.attempts.get(&stage).copied().unwrap_or(0)
    }

    /// Count of same-stage retry transitions recorded for `stage`.
    pub fn retry_transitions(&self, stage: Stage) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.from == stage && t.to == stage)
            .count()
    }

    /// Total attempts recorded across all stages.
    pub fn total_attempts(&self) -> u32 {
        self.attempts.values().sum()
    }
}
