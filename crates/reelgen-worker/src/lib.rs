//! Pipeline runner and bulk orchestrator.
//!
//! Runs one job through its stages (generate assets, align subtitles,
//! compose, render, upload) and fans batches of jobs out across a
//! bounded worker pool with durable per-job progress and resume.

pub mod accounts;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod offline;
pub mod orchestrator;
pub mod pipeline;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use manifest::{ManifestSink, ManifestStore, NullSink, ProgressSink};
pub use orchestrator::BulkOrchestrator;
pub use pipeline::{run_job, PipelineContext};
