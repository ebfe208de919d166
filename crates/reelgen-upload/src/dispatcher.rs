//! Upload dispatcher: submit a rendered artifact under a pool account,
//! rotating accounts on rate limits and classifying failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use reelgen_models::{
    AssetRef, ErrorKind, JobError, JobSpec, JobState, Stage, UploadMetadata, UploadResult,
};

use crate::auth::AuthProvider;
use crate::error::NoAccountAvailable;
use crate::pool::{AccountPool, UploadOutcome};

/// Classified response from the hosting platform.
#[derive(Debug, Clone)]
pub enum UploadResponse {
    Ok { remote_id: String },
    RateLimited { retry_after: Duration },
    /// Retriable failure (timeouts, 5xx)
    Transient { reason: String },
    /// Non-retriable failure (content rejected, forbidden)
    Permanent { reason: String },
}

/// Hosting platform client. Implementations map platform responses onto
/// [`UploadResponse`]; infrastructure errors surface as `Transient`.
#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload(
        &self,
        token: &str,
        video: &AssetRef,
        metadata: &UploadMetadata,
    ) -> UploadResponse;
}

/// Dispatcher tuning values.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upload attempts allowed per job, including the first
    pub max_attempts: u32,
    /// Delay between retriable attempts
    pub retry_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Drives the `uploading` stage of a job.
///
/// Each attempt acquires a fresh account from the pool (honouring the
/// job spec's preferred account), fetches its credential, and submits the
/// artifact. Rate limits cool the account down and retry on another one,
/// recording an `uploading -> uploading` transition; permanent failures
/// end the job.
pub struct UploadDispatcher {
    pool: Arc<AccountPool>,
    auth: Arc<dyn AuthProvider>,
    client: Arc<dyn UploadClient>,
    config: DispatcherConfig,
}

impl UploadDispatcher {
    pub fn new(
        pool: Arc<AccountPool>,
        auth: Arc<dyn AuthProvider>,
        client: Arc<dyn UploadClient>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            pool,
            auth,
            client,
            config,
        }
    }

    pub fn pool(&self) -> &Arc<AccountPool> {
        &self.pool
    }

    /// Upload a finished artifact for `spec`, recording attempts and
    /// retry transitions on `state`.
    ///
    /// Returns the job's `UploadResult` (success or failure), or
    /// `NoAccountAvailable` when no account is currently eligible; the
    /// caller re-queues the job in that case.
    pub async fn dispatch(
        &self,
        spec: &JobSpec,
        video: &AssetRef,
        state: &mut JobState,
    ) -> Result<UploadResult, NoAccountAvailable> {
        let mut attempts = 0u32;
        loop {
            let account = self.pool.acquire_preferred(spec.account.as_ref()).await?;
            attempts += 1;
            state.begin_attempt(Stage::Uploading);

            let credential = match self.auth.credential(&account.id).await {
                Ok(credential) => credential,
                Err(e) if e.is_permanent() => {
                    self.pool.report(&account.id, UploadOutcome::AuthRevoked).await;
                    warn!(job_id = %spec.id, account = %account.id, error = %e, "upload aborted on revoked credentials");
                    return Ok(UploadResult::failed(
                        ErrorKind::Auth.to_string(),
                        false,
                        attempts,
                    ));
                }
                Err(e) => {
                    self.pool
                        .report(&account.id, UploadOutcome::TransientFailure)
                        .await;
                    if attempts >= self.config.max_attempts {
                        return Ok(UploadResult::failed(
                            ErrorKind::Auth.to_string(),
                            true,
                            attempts,
                        ));
                    }
                    state.record_retry(JobError::new(ErrorKind::Auth, e.to_string()));
                    tokio::time::sleep(self.config.retry_delay).await;
                    continue;
                }
            };

            match self
                .client
                .upload(credential.token(), video, &spec.upload)
                .await
            {
                UploadResponse::Ok { remote_id } => {
                    self.pool.report(&account.id, UploadOutcome::Success).await;
                    info!(job_id = %spec.id, account = %account.id, %remote_id, "upload complete");
                    return Ok(UploadResult::succeeded(remote_id, account.id, attempts));
                }
                UploadResponse::RateLimited { retry_after } => {
                    self.pool
                        .report(&account.id, UploadOutcome::RateLimited { retry_after })
                        .await;
                    if attempts >= self.config.max_attempts {
                        return Ok(UploadResult::failed("rate_limited", true, attempts));
                    }
                    state.record_retry(JobError::new(ErrorKind::Upload, "rate limited"));
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                UploadResponse::Transient { reason } => {
                    self.pool
                        .report(&account.id, UploadOutcome::TransientFailure)
                        .await;
                    if attempts >= self.config.max_attempts {
                        return Ok(UploadResult::failed(reason, true, attempts));
                    }
                    state.record_retry(JobError::new(ErrorKind::Upload, reason));
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                UploadResponse::Permanent { reason } => {
                    self.pool
                        .report(&account.id, UploadOutcome::PermanentFailure)
                        .await;
                    warn!(job_id = %spec.id, account = %account.id, %reason, "upload rejected permanently");
                    return Ok(UploadResult::failed(reason, false, attempts));
                }
            }
        }
    }
}
