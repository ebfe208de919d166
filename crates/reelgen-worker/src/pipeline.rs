//! Single-job pipeline runner.
//!
//! Drives one job through its stages in order, persisting state through
//! the progress sink after every transition so an interrupted run can
//! resume at the first incomplete stage. Stage outputs already present
//! on the state (from a prior partial run) are never regenerated.

use std::sync::Arc;

use tokio::sync::watch;

use reelgen_assets::{AssetGateway, GenerateOptions, GenerationError};
use reelgen_media::{align_text, compose, RenderPipeline};
use reelgen_models::{
    AssetKind, AssetRef, ErrorKind, JobError, JobSpec, JobState, NarrationAsset, Stage,
};
use reelgen_upload::{NoAccountAvailable, UploadDispatcher};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::manifest::ProgressSink;
use crate::retry::{retry_async, RetryConfig};

/// Shared handles a pipeline run needs. Cheap to clone per job.
#[derive(Clone)]
pub struct PipelineContext {
    pub gateway: AssetGateway,
    pub renderer: Arc<RenderPipeline>,
    pub dispatcher: Arc<UploadDispatcher>,
    pub config: Arc<WorkerConfig>,
    pub cancel: watch::Receiver<bool>,
}

/// Run one job to a terminal stage.
///
/// Returns the final state (`done` or `failed`). Errors are reserved for
/// conditions the caller must handle: `NoAccount` (re-queue the job),
/// `Interrupted` (cancellation requested), and persistence failures. In
/// every error case the latest state has already been recorded through
/// the sink, so the job resumes where it left off.
pub async fn run_job(
    ctx: &PipelineContext,
    spec: &JobSpec,
    mut state: JobState,
    sink: &dyn ProgressSink,
) -> WorkerResult<JobState> {
    let logger = JobLogger::new(&spec.id);

    loop {
        if *ctx.cancel.borrow() {
            sink.record(&state).await?;
            return Err(WorkerError::Interrupted);
        }

        match state.stage {
            Stage::Pending => {
                state.advance(Stage::GeneratingAssets);
                sink.record(&state).await?;
            }
            Stage::GeneratingAssets => {
                let attempt = state.begin_attempt(Stage::GeneratingAssets);
                logger.stage_started(Stage::GeneratingAssets, attempt);
                match generate_assets(ctx, spec, &mut state, sink).await {
                    Ok(()) => {
                        state.advance(Stage::AligningSubtitles);
                        sink.record(&state).await?;
                    }
                    Err(e) => return fail_or_propagate(&logger, state, sink, e).await,
                }
            }
            Stage::AligningSubtitles => {
                let attempt = state.begin_attempt(Stage::AligningSubtitles);
                logger.stage_started(Stage::AligningSubtitles, attempt);
                match align_subtitles(ctx, &mut state).await {
                    Ok(()) => {
                        state.advance(Stage::Composing);
                        sink.record(&state).await?;
                    }
                    Err(e) => return fail_or_propagate(&logger, state, sink, e).await,
                }
            }
            Stage::Composing => {
                let attempt = state.begin_attempt(Stage::Composing);
                logger.stage_started(Stage::Composing, attempt);
                match compose_timeline(ctx, &mut state) {
                    Ok(()) => {
                        state.advance(Stage::Rendering);
                        sink.record(&state).await?;
                    }
                    Err(e) => return fail_or_propagate(&logger, state, sink, e).await,
                }
            }
            Stage::Rendering => {
                let attempt = state.begin_attempt(Stage::Rendering);
                logger.stage_started(Stage::Rendering, attempt);
                match render(ctx, &mut state).await {
                    Ok(()) => {
                        state.advance(Stage::Uploading);
                        sink.record(&state).await?;
                    }
                    Err(e) => return fail_or_propagate(&logger, state, sink, e).await,
                }
            }
            Stage::Uploading => {
                logger.stage_started(Stage::Uploading, state.attempts_for(Stage::Uploading) + 1);
                let video = match state.video.clone() {
                    Some(video) => video,
                    None => {
                        let e = WorkerError::invalid_state("uploading with no rendered video");
                        return fail_or_propagate(&logger, state, sink, e).await;
                    }
                };
                match ctx.dispatcher.dispatch(spec, &video, &mut state).await {
                    Ok(result) if result.success => {
                        state.upload = Some(result);
                        state.advance(Stage::Done);
                        sink.record(&state).await?;
                    }
                    Ok(result) => {
                        let kind = if result.error_kind.as_deref() == Some(ErrorKind::Auth.as_str())
                        {
                            ErrorKind::Auth
                        } else {
                            ErrorKind::Upload
                        };
                        let message = result
                            .error_kind
                            .clone()
                            .unwrap_or_else(|| "upload failed".to_string());
                        state.upload = Some(result);
                        logger.stage_failed(Stage::Uploading, &message);
                        state.fail(JobError::new(kind, message));
                        sink.record(&state).await?;
                    }
                    Err(NoAccountAvailable) => {
                        // Keep the state resumable and hand the decision
                        // back to the orchestrator.
                        sink.record(&state).await?;
                        return Err(WorkerError::NoAccount(NoAccountAvailable));
                    }
                }
            }
            Stage::Done => {
                logger.completed("all stages finished");
                return Ok(state);
            }
            Stage::Failed => return Ok(state),
        }
    }
}

/// Record a permanent stage failure on the job, or propagate errors the
/// caller owns (persistence, cancellation, account starvation).
async fn fail_or_propagate(
    logger: &JobLogger,
    mut state: JobState,
    sink: &dyn ProgressSink,
    error: WorkerError,
) -> WorkerResult<JobState> {
    match error {
        e @ (WorkerError::Manifest(_)
        | WorkerError::Io(_)
        | WorkerError::Interrupted
        | WorkerError::NoAccount(_)) => Err(e),
        e => {
            logger.stage_failed(state.stage, &e.to_string());
            state.fail(e.to_job_error());
            sink.record(&state).await?;
            Ok(state)
        }
    }
}

fn generation_retry(config: &WorkerConfig, operation: &str) -> RetryConfig {
    RetryConfig::new(operation)
        .with_max_retries(config.generation_attempts.saturating_sub(1))
        .with_base_delay(config.generation_base_delay)
        .with_max_delay(config.generation_max_delay)
}

/// Produce the narration, visuals, subtitle text and music reference,
/// skipping anything a prior run already produced. State is persisted
/// after each asset so a crash mid-stage loses at most one asset.
async fn generate_assets(
    ctx: &PipelineContext,
    spec: &JobSpec,
    state: &mut JobState,
    sink: &dyn ProgressSink,
) -> WorkerResult<()> {
    let transient = |e: &GenerationError| e.is_transient();

    if state.narration.is_none() {
        let options = GenerateOptions {
            preset: spec.preset.clone(),
            target_secs: spec.target_secs,
            ..Default::default()
        };
        let retry = generation_retry(&ctx.config, "generate_narration");
        let asset = retry_async(
            &retry,
            || ctx.gateway.generate(AssetKind::NarrationAudio, &spec.script, &options),
            transient,
        )
        .await
        .into_result()?;
        let duration_secs = asset.duration_secs.ok_or_else(|| {
            WorkerError::invalid_state("narration backend reported no duration")
        })?;
        state.narration = Some(NarrationAsset {
            asset,
            duration_secs,
        });
        sink.record(state).await?;
    }

    let narration_secs = state
        .narration
        .as_ref()
        .map(|n| n.duration_secs)
        .unwrap_or_default();
    let wanted = spec.visual_count.unwrap_or_else(|| {
        ((narration_secs / ctx.config.composer.default_segment_secs).ceil() as usize).max(1)
    });
    while state.visuals.len() < wanted {
        let index = state.visuals.len();
        let options = GenerateOptions {
            preset: spec.preset.clone(),
            style_hint: Some(format!("scene {} of {}", index + 1, wanted)),
            ..Default::default()
        };
        let retry = generation_retry(&ctx.config, "generate_visual");
        let asset = retry_async(
            &retry,
            || ctx.gateway.generate(AssetKind::Image, &spec.script, &options),
            transient,
        )
        .await
        .into_result()?;
        state.visuals.push(asset);
        sink.record(state).await?;
    }

    if state.subtitle_text.is_none() {
        let options = GenerateOptions::for_preset(&spec.preset);
        let retry = generation_retry(&ctx.config, "generate_subtitle_text");
        let asset = retry_async(
            &retry,
            || ctx.gateway.generate(AssetKind::SubtitleText, &spec.script, &options),
            transient,
        )
        .await
        .into_result()?;
        state.subtitle_text = Some(asset);
        sink.record(state).await?;
    }

    if state.music.is_none() {
        if let Some(music) = &spec.music {
            state.music = Some(AssetRef::new(AssetKind::Music, music.clone()));
            sink.record(state).await?;
        }
    }

    Ok(())
}

async fn align_subtitles(ctx: &PipelineContext, state: &mut JobState) -> WorkerResult<()> {
    let narration = state
        .narration
        .clone()
        .ok_or_else(|| WorkerError::invalid_state("aligning with no narration"))?;
    let subtitle_text = state
        .subtitle_text
        .clone()
        .ok_or_else(|| WorkerError::invalid_state("aligning with no subtitle text"))?;

    let text = ctx.gateway.store().read_text(&subtitle_text).await?;
    let cues = align_text(narration.duration_secs, &text, &ctx.config.aligner)?;
    state.cues = cues;
    Ok(())
}

fn compose_timeline(ctx: &PipelineContext, state: &mut JobState) -> WorkerResult<()> {
    let narration = state
        .narration
        .clone()
        .ok_or_else(|| WorkerError::invalid_state("composing with no narration"))?;
    let timeline = compose(
        narration.asset,
        narration.duration_secs,
        state.visuals.clone(),
        state.music.clone(),
        state.cues.clone(),
        &ctx.config.composer,
    )?;
    state.timeline = Some(timeline);
    Ok(())
}

async fn render(ctx: &PipelineContext, state: &mut JobState) -> WorkerResult<()> {
    let timeline = state
        .timeline
        .clone()
        .ok_or_else(|| WorkerError::invalid_state("rendering with no timeline"))?;
    let video = ctx.renderer.render(&timeline).await?;
    state.video = Some(video);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use reelgen_assets::ContentStore;
    use reelgen_media::{RenderBackend, RenderError};
    use reelgen_models::{
        Account, AccountId, BatchId, BatchManifest, QuotaLimits, Timeline,
    };
    use reelgen_upload::{AccountPool, StaticAuthProvider};

    use crate::manifest::{ManifestSink, ManifestStore, NullSink};
    use crate::offline::{OfflineAssetBackend, OfflineRenderBackend, OfflineUploadClient};

    fn accounts() -> Vec<Account> {
        vec![Account::new(
            AccountId::new("main"),
            QuotaLimits {
                per_minute: 100,
                per_day: 100,
            },
        )]
    }

    async fn offline_ctx(dir: &Path, accounts: Vec<Account>) -> PipelineContext {
        let config = Arc::new(WorkerConfig::default());
        let store = ContentStore::new(dir.join("assets")).await.unwrap();
        let gateway = AssetGateway::new(Arc::new(OfflineAssetBackend), store);
        let renderer = Arc::new(RenderPipeline::new(
            Arc::new(OfflineRenderBackend),
            config.render.clone(),
            config.max_concurrent_renders,
        ));
        let mut auth = StaticAuthProvider::new();
        for account in &accounts {
            auth = auth.with_token(account.id.clone(), format!("token-{}", account.id));
        }
        let dispatcher = Arc::new(UploadDispatcher::new(
            Arc::new(AccountPool::new(accounts)),
            Arc::new(auth),
            Arc::new(OfflineUploadClient),
            config.upload.clone(),
        ));
        let (_tx, cancel) = watch::channel(false);
        PipelineContext {
            gateway,
            renderer,
            dispatcher,
            config,
            cancel,
        }
    }

    fn spec() -> JobSpec {
        JobSpec::new(
            "A short tale",
            "One sentence here. Another sentence follows. And a closing thought.",
            "default",
        )
        .with_music("calm")
    }

    #[tokio::test]
    async fn full_run_reaches_done() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = offline_ctx(dir.path(), accounts()).await;
        let spec = spec();
        let state = JobState::new(spec.id.clone());

        let state = run_job(&ctx, &spec, state, &NullSink).await.unwrap();

        assert_eq!(state.stage, Stage::Done);
        assert!(state.narration.is_some());
        assert!(!state.visuals.is_empty());
        assert!(!state.cues.is_empty());
        assert!(state.video.is_some());
        let upload = state.upload.as_ref().unwrap();
        assert!(upload.success);
        assert_eq!(upload.account, Some(AccountId::new("main")));

        // Visuals exactly cover the narration.
        let timeline = state.timeline.as_ref().unwrap();
        assert!((timeline.total_visual_secs() - timeline.narration_secs).abs() < 1e-6);
        // Music selection carried through to the timeline.
        assert!(timeline.music.is_some());

        // Every stage ran exactly once.
        for stage in [
            Stage::GeneratingAssets,
            Stage::AligningSubtitles,
            Stage::Composing,
            Stage::Rendering,
            Stage::Uploading,
        ] {
            assert_eq!(state.attempts_for(stage), 1, "stage {stage}");
        }
    }

    #[tokio::test]
    async fn resume_skips_completed_stages() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = offline_ctx(dir.path(), accounts()).await;
        let spec = spec();

        // First pass builds everything up to the rendered video.
        let state = JobState::new(spec.id.clone());
        let mut done = run_job(&ctx, &spec, state, &NullSink).await.unwrap();
        assert_eq!(done.stage, Stage::Done);

        // Rewind to rendering as if the process died there: keep stage
        // outputs, clear the ones rendering onward would produce.
        done.stage = Stage::Rendering;
        done.video = None;
        done.upload = None;
        let generation_attempts = done.attempts_for(Stage::GeneratingAssets);

        let resumed = run_job(&ctx, &spec, done, &NullSink).await.unwrap();
        assert_eq!(resumed.stage, Stage::Done);
        // Earlier stages were not re-run.
        assert_eq!(
            resumed.attempts_for(Stage::GeneratingAssets),
            generation_attempts
        );
        assert_eq!(resumed.attempts_for(Stage::Rendering), 2);
    }

    struct PermanentRenderFailure;

    #[async_trait]
    impl RenderBackend for PermanentRenderFailure {
        async fn render(&self, _timeline: &Timeline) -> Result<AssetRef, RenderError> {
            Err(RenderError::permanent("codec rejected the timeline"))
        }
    }

    #[tokio::test]
    async fn permanent_render_failure_fails_the_job_without_retries() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = offline_ctx(dir.path(), accounts()).await;
        ctx.renderer = Arc::new(RenderPipeline::new(
            Arc::new(PermanentRenderFailure),
            ctx.config.render.clone(),
            1,
        ));
        let spec = spec();
        let state = JobState::new(spec.id.clone());

        let state = run_job(&ctx, &spec, state, &NullSink).await.unwrap();

        assert_eq!(state.stage, Stage::Failed);
        assert_eq!(state.last_error.as_ref().unwrap().kind, ErrorKind::Render);
        assert_eq!(state.attempts_for(Stage::Rendering), 1);
        assert_eq!(state.retry_transitions(Stage::Rendering), 0);
        // The job never reached the upload stage.
        assert_eq!(state.attempts_for(Stage::Uploading), 0);
    }

    struct RateLimitedTwice {
        calls: std::sync::Mutex<u32>,
    }

    #[async_trait]
    impl reelgen_upload::UploadClient for RateLimitedTwice {
        async fn upload(
            &self,
            _token: &str,
            _video: &AssetRef,
            _metadata: &reelgen_models::UploadMetadata,
        ) -> reelgen_upload::UploadResponse {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= 2 {
                reelgen_upload::UploadResponse::RateLimited {
                    retry_after: Duration::ZERO,
                }
            } else {
                reelgen_upload::UploadResponse::Ok {
                    remote_id: "vid-after-limits".to_string(),
                }
            }
        }
    }

    #[tokio::test]
    async fn rate_limited_uploads_retry_through_to_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = offline_ctx(dir.path(), accounts()).await;
        let auth = StaticAuthProvider::new().with_token(AccountId::new("main"), "token");
        ctx.dispatcher = Arc::new(UploadDispatcher::new(
            Arc::new(AccountPool::new(accounts())),
            Arc::new(auth),
            Arc::new(RateLimitedTwice {
                calls: std::sync::Mutex::new(0),
            }),
            reelgen_upload::DispatcherConfig {
                max_attempts: 4,
                retry_delay: Duration::from_millis(1),
            },
        ));
        let spec = spec();
        let state = JobState::new(spec.id.clone());

        let state = run_job(&ctx, &spec, state, &NullSink).await.unwrap();
        assert_eq!(state.stage, Stage::Done);
        assert_eq!(state.retry_transitions(Stage::Uploading), 2);
        assert_eq!(state.attempts_for(Stage::Uploading), 3);
    }

    #[tokio::test]
    async fn no_eligible_account_surfaces_for_requeue() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = offline_ctx(dir.path(), Vec::new()).await;
        let spec = spec();
        let state = JobState::new(spec.id.clone());

        let err = run_job(&ctx, &spec, state, &NullSink).await.unwrap_err();
        assert!(matches!(err, WorkerError::NoAccount(_)));
    }

    #[tokio::test]
    async fn cancellation_leaves_a_resumable_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = offline_ctx(dir.path(), accounts()).await;
        let (tx, cancel) = watch::channel(true);
        ctx.cancel = cancel;

        let spec = spec();
        let manifest = Arc::new(Mutex::new(BatchManifest::new(
            BatchId::new(),
            vec![spec.clone()],
        )));
        let store = Arc::new(ManifestStore::new(dir.path().join("state.json")));
        let sink = ManifestSink::new(manifest.clone(), store.clone());

        let state = JobState::new(spec.id.clone());
        let err = run_job(&ctx, &spec, state, &sink).await.unwrap_err();
        assert!(matches!(err, WorkerError::Interrupted));

        // The persisted state is not terminal, so a later run resumes it.
        let persisted = store.load().await.unwrap();
        assert!(!persisted.states[&spec.id].is_terminal());

        drop(tx);
    }
}
