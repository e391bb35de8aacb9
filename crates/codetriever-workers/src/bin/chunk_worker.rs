//! Chunk worker binary (SPEC_FULL.md §4.4, §6).
//!
//! Measures the token budget against the embedding model's own tokenizer
//! when one is available, so a chunk never arrives at the embed stage
//! already over the model's real limit; falls back to a `tiktoken` encoder
//! when the provider has none to offer (e.g. a model backend that hasn't
//! loaded yet).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use codetriever_chunking::{HfTokenCounter, HybridChunkerConfig, TiktokenCounter, TokenCounter};
use codetriever_orchestration::{ChunkJob, ChunkStage};
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(about = "Chunk worker: splits a structured document into token-bounded chunks")]
struct Args {
    /// Stable identifier for this worker instance, carried into every log line.
    #[arg(long)]
    worker_id: String,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

/// Either the embedding model's own tokenizer or a fallback `tiktoken`
/// encoder, picked once at startup.
enum CounterBackend {
    Hf(HfTokenCounter),
    Tiktoken(TiktokenCounter),
}

impl TokenCounter for CounterBackend {
    fn name(&self) -> &str {
        match self {
            Self::Hf(c) => c.name(),
            Self::Tiktoken(c) => c.name(),
        }
    }

    fn max_tokens(&self) -> usize {
        match self {
            Self::Hf(c) => c.max_tokens(),
            Self::Tiktoken(c) => c.max_tokens(),
        }
    }

    fn count(&self, text: &str) -> usize {
        match self {
            Self::Hf(c) => c.count(text),
            Self::Tiktoken(c) => c.count(text),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codetriever_common::init::initialize_environment();
    let args = Args::parse();
    codetriever_workers::init_tracing(args.debug);

    let config = codetriever_config::ApplicationConfig::from_env()?;
    config.ensure_directories()?;

    let broker = codetriever_workers::setup_broker(&config).await?;
    let embeddings = codetriever_workers::setup_embedding_service(&config).await?;

    let counter = match embeddings.provider().get_tokenizer().await {
        Some(tokenizer) => CounterBackend::Hf(HfTokenCounter::new(
            tokenizer,
            config.embedding.model.id.clone(),
            config.chunking.max_tokens,
        )),
        None => {
            warn!("embedding provider exposed no tokenizer, falling back to tiktoken for chunk sizing");
            CounterBackend::Tiktoken(TiktokenCounter::for_budget(config.chunking.max_tokens)?)
        }
    };

    let stage = ChunkStage::new(
        counter,
        HybridChunkerConfig {
            max_tokens: config.chunking.max_tokens,
            merge_peers: config.chunking.merge_peers,
        },
        broker.clone(),
        config.broker.embed_jobs_queue.clone(),
        config.chunking.processed_dir.clone(),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = codetriever_workers::wait_for_shutdown_signal().await {
            error!(error = %e, "failed to install signal handlers");
        }
        shutdown_signal.store(true, Ordering::Relaxed);
    });

    tracing::info!(worker_id = %args.worker_id, stage = "chunking", event = "worker_started", "chunk worker started");

    codetriever_orchestration::worker_loop::run(
        broker,
        &config.broker.chunk_jobs_queue,
        Duration::from_secs(config.broker.pop_timeout_secs),
        Duration::from_secs(config.manager.error_backoff_secs),
        shutdown,
        |payload| {
            let stage = &stage;
            let worker_id = args.worker_id.clone();
            async move {
                let job: ChunkJob = match serde_json::from_str(&payload) {
                    Ok(job) => job,
                    Err(e) => {
                        warn!(worker_id = %worker_id, stage = "chunking", event = "malformed_job", error = %e, "dropping malformed chunk job");
                        return;
                    }
                };
                let trace_id = job.trace_id.clone();
                if let Err(e) = stage.process_job(job).await {
                    error!(trace_id = %trace_id, worker_id = %worker_id, stage = "chunking", event = "job_failed", error = %e, "chunk job failed");
                }
            }
        },
    )
    .await;

    tracing::info!(worker_id = %args.worker_id, stage = "chunking", event = "shutdown_complete", "chunk worker shutting down");
    Ok(())
}
