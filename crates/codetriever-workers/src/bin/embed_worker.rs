//! Embed worker binary (SPEC_FULL.md §4.5, §6).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use codetriever_orchestration::{EmbedJob, EmbedStage};
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(about = "Embed worker: embeds staged chunks and upserts them into the vector store")]
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
    let embeddings = codetriever_workers::setup_embedding_service(&config).await?;
    let dimensions = embeddings.provider().embedding_dimension();
    let vector_storage = codetriever_workers::setup_vector_storage(&config, dimensions).await?;

    let stage = EmbedStage::new(embeddings, vector_storage, status);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = codetriever_workers::wait_for_shutdown_signal().await {
            error!(error = %e, "failed to install signal handlers");
        }
        shutdown_signal.store(true, Ordering::Relaxed);
    });

    tracing::info!(worker_id = %args.worker_id, stage = "embedding", event = "worker_started", "embed worker started");

    codetriever_orchestration::worker_loop::run(
        broker,
        &config.broker.embed_jobs_queue,
        Duration::from_secs(config.broker.pop_timeout_secs),
        Duration::from_secs(config.manager.error_backoff_secs),
        shutdown,
        |payload| {
            let stage = &stage;
            let worker_id = args.worker_id.clone();
            async move {
                let job: EmbedJob = match serde_json::from_str(&payload) {
                    Ok(job) => job,
                    Err(e) => {
                        warn!(worker_id = %worker_id, stage = "embedding", event = "malformed_job", error = %e, "dropping malformed embed job");
                        return;
                    }
                };
                let chunks_file = job.chunks_file_reference.clone();
                if let Err(e) = stage.process_job(job).await {
                    error!(chunks_file = %chunks_file, worker_id = %worker_id, stage = "embedding", event = "job_failed", error = %e, "embed job failed");
                }
            }
        },
    )
    .await;

    tracing::info!(worker_id = %args.worker_id, stage = "embedding", event = "shutdown_complete", "embed worker shutting down");
    Ok(())
}
