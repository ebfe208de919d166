//! Worker configuration.

use std::time::Duration;

use reelgen_media::{AlignerConfig, ComposerConfig, RenderPolicy};
use reelgen_upload::DispatcherConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs in a bulk run
    pub max_concurrent_jobs: usize,
    /// Maximum concurrent renders across all jobs
    pub max_concurrent_renders: usize,
    /// Generation attempts allowed per stage, including the first
    pub generation_attempts: u32,
    /// Base delay for generation retry backoff (doubles each attempt)
    pub generation_base_delay: Duration,
    /// Cap on the generation retry delay
    pub generation_max_delay: Duration,
    /// Render retry policy (transient failures only)
    pub render: RenderPolicy,
    /// Upload dispatcher tuning
    pub upload: DispatcherConfig,
    /// How long a job may wait for an eligible upload account before it
    /// is failed with `no_account`
    pub no_account_timeout: Duration,
    /// Delay between account-availability re-checks while waiting
    pub no_account_retry_delay: Duration,
    /// Work directory for generated media and manifests
    pub work_dir: String,
    /// Subtitle aligner tuning
    pub aligner: AlignerConfig,
    /// Timeline composer tuning
    pub composer: ComposerConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            max_concurrent_renders: 2,
            generation_attempts: 3,
            generation_base_delay: Duration::from_millis(500),
            generation_max_delay: Duration::from_secs(30),
            render: RenderPolicy::default(),
            upload: DispatcherConfig::default(),
            no_account_timeout: Duration::from_secs(600),
            no_account_retry_delay: Duration::from_secs(30),
            work_dir: "/tmp/reelgen".to_string(),
            aligner: AlignerConfig::default(),
            composer: ComposerConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
            max_concurrent_renders: std::env::var("WORKER_MAX_RENDERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_renders),
            generation_attempts: std::env::var("WORKER_GENERATION_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.generation_attempts),
            generation_base_delay: Duration::from_millis(
                std::env::var("WORKER_GENERATION_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            generation_max_delay: Duration::from_secs(
                std::env::var("WORKER_GENERATION_MAX_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            render: RenderPolicy {
                max_attempts: std::env::var("WORKER_RENDER_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.render.max_attempts),
                ..defaults.render.clone()
            },
            upload: DispatcherConfig {
                max_attempts: std::env::var("WORKER_UPLOAD_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.upload.max_attempts),
                ..defaults.upload.clone()
            },
            no_account_timeout: Duration::from_secs(
                std::env::var("WORKER_NO_ACCOUNT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            no_account_retry_delay: Duration::from_secs(
                std::env::var("WORKER_NO_ACCOUNT_RETRY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/reelgen".to_string()),
            aligner: AlignerConfig {
                max_chars_per_cue: std::env::var("WORKER_SUBTITLE_MAX_CHARS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.aligner.max_chars_per_cue),
                ..defaults.aligner.clone()
            },
            composer: ComposerConfig {
                default_segment_secs: std::env::var("WORKER_SEGMENT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.composer.default_segment_secs),
                ..defaults.composer.clone()
            },
        }
    }
}
