//! Extract worker binary (SPEC_FULL.md §4.3, §6).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use codetriever_orchestration::{ExtractJob, ExtractStage};
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(about = "Extract worker: converts a claimed file into a structured document")]
struct Args {
    /// Stable identifier for this worker instance, carried into every log line.
    #[arg(long)]
    worker_id: String,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codetriever_common::init::initialize_environment();
    let args = Args::parse();
    codetriever_workers::init_tracing(args.debug);

    let config = codetriever_config::ApplicationConfig::from_env()?;
    config.ensure_directories()?;

    let broker = codetriever_workers::setup_broker(&config).await?;
    let status = codetriever_workers::setup_status_store(&config).await?;
    let converter = codetriever_workers::setup_converter();

    let stage = ExtractStage::new(
        converter,
        status,
        broker.clone(),
        config.broker.chunk_jobs_queue.clone(),
        args.worker_id.clone(),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = codetriever_workers::wait_for_shutdown_signal().await {
            error!(error = %e, "failed to install signal handlers");
        }
        shutdown_signal.store(true, Ordering::Relaxed);
    });

    tracing::info!(worker_id = %args.worker_id, stage = "extraction", event = "worker_started", "extract worker started");

    codetriever_orchestration::worker_loop::run(
        broker,
        &config.broker.extraction_jobs_queue,
        Duration::from_secs(config.broker.pop_timeout_secs),
        Duration::from_secs(config.manager.error_backoff_secs),
        shutdown,
        |payload| {
            let stage = &stage;
            let worker_id = args.worker_id.clone();
            async move {
                let job: ExtractJob = match serde_json::from_str(&payload) {
                    Ok(job) => job,
                    Err(e) => {
                        warn!(worker_id = %worker_id, stage = "extraction", event = "malformed_job", error = %e, "dropping malformed extract job");
                        return;
                    }
                };
                let trace_id = job.trace_id.clone();
                if let Err(e) = stage.process_job(job).await {
                    error!(trace_id = %trace_id, worker_id = %worker_id, stage = "extraction", event = "job_failed", error = %e, "extract job failed");
                }
            }
        },
    )
    .await;

    tracing::info!(worker_id = %args.worker_id, stage = "extraction", event = "shutdown_complete", "extract worker shutting down");
    Ok(())
}
