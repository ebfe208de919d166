//! Render pipeline: drive a composed timeline through a rendering
//! backend with bounded concurrency and retry-on-transient-failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use reelgen_models::{AssetRef, Timeline};

use crate::error::RenderError;

/// A rendering backend that turns a timeline into a video artifact.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(&self, timeline: &Timeline) -> Result<AssetRef, RenderError>;
}

/// Retry policy for transient render failures.
#[derive(Debug, Clone)]
pub struct RenderPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Base delay for exponential backoff (doubles each attempt)
    pub base_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RenderPolicy {
    /// Delay before the given retry attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        delay.min(self.max_delay)
    }
}

/// Render stage driver.
///
/// Rendering is the resource-heavy stage, so concurrent renders are
/// capped by a semaphore regardless of how many jobs are in flight.
/// Transient backend failures are retried with exponential backoff up to
/// the policy's attempt limit; permanent failures propagate immediately.
pub struct RenderPipeline {
    backend: Arc<dyn RenderBackend>,
    policy: RenderPolicy,
    slots: Arc<Semaphore>,
}

impl RenderPipeline {
    pub fn new(backend: Arc<dyn RenderBackend>, policy: RenderPolicy, max_concurrent: usize) -> Self {
        Self {
            backend,
            policy,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Render a timeline to a final video artifact.
    pub async fn render(&self, timeline: &Timeline) -> Result<AssetRef, RenderError> {
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| RenderError::permanent("render pool closed"))?;

        let mut attempt = 1u32;
        loop {
            match self.backend.render(timeline).await {
                Ok(asset) => {
                    debug!(attempt, asset = %asset, "render complete");
                    return Ok(asset);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "render failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
