//! Bulk orchestrator.
//!
//! Fans the incomplete jobs of a batch manifest out across a bounded
//! pool of pipeline runs. One failed job never stops the batch; jobs
//! that cannot get an upload account are re-queued until a deadline and
//! then failed; cancellation stops spawning new work and lets the
//! manifest carry the resume point.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use reelgen_models::{BatchManifest, BatchSummary, ErrorKind, JobError, JobSpec};

use crate::error::{WorkerError, WorkerResult};
use crate::manifest::{ManifestSink, ManifestStore, ProgressSink};
use crate::pipeline::{run_job, PipelineContext};

pub struct BulkOrchestrator {
    ctx: PipelineContext,
    store: Arc<ManifestStore>,
    manifest: Arc<Mutex<BatchManifest>>,
}

impl BulkOrchestrator {
    pub fn new(
        ctx: PipelineContext,
        store: Arc<ManifestStore>,
        manifest: Arc<Mutex<BatchManifest>>,
    ) -> Self {
        Self {
            ctx,
            store,
            manifest,
        }
    }

    pub fn manifest(&self) -> &Arc<Mutex<BatchManifest>> {
        &self.manifest
    }

    /// Run every incomplete job in the batch to a terminal stage (or
    /// until cancellation) and return the outcome counts.
    pub async fn run(&self) -> WorkerResult<BatchSummary> {
        let pending: Vec<JobSpec> = {
            let manifest = self.manifest.lock().await;
            manifest.incomplete_specs().into_iter().cloned().collect()
        };
        info!(jobs = pending.len(), "starting batch run");

        let sink = Arc::new(ManifestSink::new(self.manifest.clone(), self.store.clone()));
        let slots = Arc::new(Semaphore::new(self.ctx.config.max_concurrent_jobs.max(1)));
        let account_deadline = Instant::now() + self.ctx.config.no_account_timeout;

        let mut tasks = JoinSet::new();
        for spec in pending {
            let ctx = self.ctx.clone();
            let sink = Arc::clone(&sink);
            let manifest = Arc::clone(&self.manifest);
            let slots = Arc::clone(&slots);
            tasks.spawn(drive_job(ctx, spec, manifest, sink, slots, account_deadline));
        }
        while tasks.join_next().await.is_some() {}

        let manifest = self.manifest.lock().await;
        self.store.save(&manifest).await?;
        let summary = manifest.summary();
        info!(batch_id = %manifest.batch_id, %summary, "batch finished");
        Ok(summary)
    }
}

/// Run one job, re-queueing on account starvation until the deadline.
///
/// The concurrency permit is released while the job waits for an
/// account, so starved jobs never block eligible ones.
async fn drive_job(
    ctx: PipelineContext,
    spec: JobSpec,
    manifest: Arc<Mutex<BatchManifest>>,
    sink: Arc<ManifestSink>,
    slots: Arc<Semaphore>,
    account_deadline: Instant,
) {
    let mut cancel = ctx.cancel.clone();
    loop {
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            return;
        };
        let state = manifest.lock().await.state_or_default(&spec.id);
        let outcome = run_job(&ctx, &spec, state, sink.as_ref()).await;
        drop(permit);

        match outcome {
            Ok(_) => return,
            Err(WorkerError::NoAccount(_)) => {
                if Instant::now() >= account_deadline {
                    let mut state = manifest.lock().await.state_or_default(&spec.id);
                    state.fail(JobError::new(
                        ErrorKind::NoAccount,
                        "no eligible upload account before the wait deadline",
                    ));
                    if let Err(e) = sink.record(&state).await {
                        error!(job_id = %spec.id, error = %e, "failed to persist job state");
                    }
                    warn!(job_id = %spec.id, "job failed after waiting for an upload account");
                    return;
                }
                warn!(job_id = %spec.id, "no upload account available, re-queueing");
                tokio::select! {
                    _ = tokio::time::sleep(ctx.config.no_account_retry_delay) => {}
                    cancelled = async { cancel.wait_for(|cancelled| *cancelled).await.is_ok() } => {
                        if cancelled {
                            return;
                        }
                        // Sender gone: cancellation can no longer arrive,
                        // so wait out the delay instead of spinning.
                        tokio::time::sleep(ctx.config.no_account_retry_delay).await;
                    }
                }
            }
            Err(WorkerError::Interrupted) => {
                info!(job_id = %spec.id, "job interrupted, state kept for resume");
                return;
            }
            Err(e) => {
                error!(job_id = %spec.id, error = %e, "job aborted on infrastructure error");
                return;
            }
        }
    }
}
