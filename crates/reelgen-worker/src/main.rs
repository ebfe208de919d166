//! ReelGen worker binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::{watch, Mutex};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelgen_assets::{AssetGateway, ContentStore};
use reelgen_media::RenderPipeline;
use reelgen_models::{AccountId, BatchId, BatchManifest, BatchSummary, JobSpec};
use reelgen_upload::{AccountPool, UploadDispatcher};
use reelgen_worker::accounts::load_accounts;
use reelgen_worker::batch::read_batch_csv;
use reelgen_worker::offline::{OfflineAssetBackend, OfflineRenderBackend, OfflineUploadClient};
use reelgen_worker::pipeline::PipelineContext;
use reelgen_worker::{BulkOrchestrator, ManifestStore, WorkerConfig};

#[derive(Parser)]
#[command(name = "reelgen", version, about = "Short-form video generation and upload pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate, render and upload a single video
    Run {
        /// Video title
        #[arg(long)]
        title: String,
        /// Narration script text
        #[arg(long)]
        script: String,
        /// Generation preset
        #[arg(long, default_value = "default")]
        preset: String,
        /// Target video duration in seconds
        #[arg(long)]
        target_secs: Option<f64>,
        /// Number of visual segments to generate
        #[arg(long)]
        visual_count: Option<usize>,
        /// Background music selection
        #[arg(long)]
        music: Option<String>,
        /// Preferred upload account id
        #[arg(long)]
        account: Option<String>,
        /// Upload accounts roster (JSON)
        #[arg(long)]
        accounts: PathBuf,
        /// Job state file; defaults to a fresh file under the work dir
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Run a CSV batch of jobs with resume support
    Bulk {
        /// Batch CSV file, one job per row
        batch: PathBuf,
        /// Upload accounts roster (JSON)
        #[arg(long)]
        accounts: PathBuf,
        /// Batch manifest path; reused to resume a partial run
        #[arg(long)]
        state: PathBuf,
        /// Preset for rows that do not set one
        #[arg(long, default_value = "default")]
        preset: String,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reelgen=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("starting reelgen");

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();

    match run(cli, config).await {
        Ok(summary) if summary.is_success() => {
            info!(%summary, "run complete");
        }
        Ok(summary) => {
            error!(%summary, "run finished with failures");
            std::process::exit(1);
        }
        Err(e) => {
            error!("run failed: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, config: WorkerConfig) -> anyhow::Result<BatchSummary> {
    let config = Arc::new(config);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, stopping after current stages");
        cancel_tx.send(true).ok();
    });

    match cli.command {
        Command::Run {
            title,
            script,
            preset,
            target_secs,
            visual_count,
            music,
            account,
            accounts,
            state,
        } => {
            let mut spec = JobSpec::new(title, script, preset);
            if let Some(secs) = target_secs {
                spec = spec.with_target_secs(secs);
            }
            if let Some(count) = visual_count {
                spec = spec.with_visual_count(count);
            }
            if let Some(music) = music {
                spec = spec.with_music(music);
            }
            if let Some(account) = account {
                spec = spec.with_account(AccountId::new(account));
            }
            let state = state.unwrap_or_else(|| {
                PathBuf::from(&config.work_dir).join(format!("run-{}.json", spec.id))
            });
            launch(config, &accounts, vec![spec], state, cancel_rx).await
        }
        Command::Bulk {
            batch,
            accounts,
            state,
            preset,
        } => {
            let specs = read_batch_csv(&batch, &preset).await?;
            launch(config, &accounts, specs, state, cancel_rx).await
        }
    }
}

async fn launch(
    config: Arc<WorkerConfig>,
    accounts_path: &std::path::Path,
    specs: Vec<JobSpec>,
    state_path: PathBuf,
    cancel: watch::Receiver<bool>,
) -> anyhow::Result<BatchSummary> {
    let (accounts, auth) = load_accounts(accounts_path).await?;

    let asset_store = ContentStore::new(PathBuf::from(&config.work_dir).join("assets")).await?;
    let gateway = AssetGateway::new(Arc::new(OfflineAssetBackend), asset_store);
    let renderer = Arc::new(RenderPipeline::new(
        Arc::new(OfflineRenderBackend),
        config.render.clone(),
        config.max_concurrent_renders,
    ));
    let dispatcher = Arc::new(UploadDispatcher::new(
        Arc::new(AccountPool::new(accounts)),
        Arc::new(auth),
        Arc::new(OfflineUploadClient),
        config.upload.clone(),
    ));
    let ctx = PipelineContext {
        gateway,
        renderer,
        dispatcher,
        config,
        cancel,
    };

    let store = Arc::new(ManifestStore::new(state_path));
    let manifest = store
        .load_or_create(BatchManifest::new(BatchId::new(), specs))
        .await?;
    let orchestrator = BulkOrchestrator::new(ctx, store, Arc::new(Mutex::new(manifest)));
    Ok(orchestrator.run().await?)
}
