//! Shared data models for the ReelGen pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job specifications and per-job pipeline state
//! - Generated asset references
//! - Subtitle cues and SRT rendering
//! - Composed timelines
//! - Upload accounts, quotas and results
//! - Batch manifests for bulk runs

pub mod account;
pub mod asset;
pub mod job;
pub mod manifest;
pub mod subtitle;
pub mod timeline;
pub mod upload;

// Re-export common types
pub use account::{Account, AccountHealth, AccountId, QuotaLimits};
pub use asset::{AssetKind, AssetRef};
pub use job::{ErrorKind, JobError, JobId, JobSpec, JobState, NarrationAsset, Stage, StageTransition};
pub use manifest::{BatchId, BatchManifest, BatchSummary};
pub use subtitle::{cues_to_srt, SubtitleCue};
pub use timeline::{MusicMix, MusicTrack, Timeline, VisualSegment};
pub use upload::{Privacy, UploadMetadata, UploadResult};
