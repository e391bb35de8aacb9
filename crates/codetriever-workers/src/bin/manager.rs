//! Scan-claim-dispatch manager binary (SPEC_FULL.md §4.2, §6).
//!
//! `original_source/.../extraction_manager.py`'s `main()` loop: scan on a
//! fixed interval, sleep in small increments so a shutdown signal is
//! observed promptly rather than mid-sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use codetriever_orchestration::ExtractionManager;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(about = "Scan-claim-dispatch manager for the document ingestion fabric")]
struct Args {
    /// Seconds between master library scans. Defaults to the configured value.
    #[arg(long)]
    scan_interval: Option<u64>,

    /// Claim-lock TTL in seconds. Defaults to the configured value.
    #[arg(long)]
    lock_ttl: Option<u64>,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codetriever_common::init::initialize_environment();
    let args = Args::parse();
    codetriever_workers::init_tracing(args.debug);

    let mut config = codetriever_config::ApplicationConfig::from_env()?;
    if let Some(v) = args.scan_interval {
        config.manager.scan_interval_secs = v;
    }
    if let Some(v) = args.lock_ttl {
        config.manager.lock_ttl_secs = v;
    }
    config.ensure_directories()?;

    let broker = codetriever_workers::setup_broker(&config).await?;
    let status = codetriever_workers::setup_status_store(&config).await?;

    let manager = ExtractionManager::new(
        broker,
        status,
        Duration::from_secs(config.manager.lock_ttl_secs),
        config.library.supported_extensions.clone(),
        config.broker.extraction_jobs_queue.clone(),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = codetriever_workers::wait_for_shutdown_signal().await {
            error!(error = %e, "failed to install signal handlers");
        }
        shutdown_signal.store(true, Ordering::Relaxed);
    });

    let scan_interval = Duration::from_secs(config.manager.scan_interval_secs);
    let error_backoff = Duration::from_secs(config.manager.error_backoff_secs);
    let library_dir = config.library.master_library.clone();

    info!(
        scan_interval_secs = config.manager.scan_interval_secs,
        lock_ttl_secs = config.manager.lock_ttl_secs,
        event = "manager_started",
        "extraction manager started"
    );

    while !shutdown.load(Ordering::Relaxed) {
        match manager.scan_once(&library_dir).await {
            Ok(summary) => {
                info!(
                    files_found = summary.files_found,
                    jobs_created = summary.jobs_created,
                    files_skipped = summary.files_skipped,
                    event = "scan_complete",
                    "scan complete"
                );
                sleep_with_shutdown_polling(scan_interval, &shutdown).await;
            }
            Err(e) => {
                error!(error = %e, event = "scan_failed", "scan failed, backing off");
                sleep_with_shutdown_polling(error_backoff, &shutdown).await;
            }
        }
    }

    info!(event = "shutdown_complete", "manager shutting down");
    Ok(())
}

/// Sleeps in one-second increments so a shutdown signal observed mid-wait
/// ends the wait immediately instead of riding out the full interval.
async fn sleep_with_shutdown_polling(total: Duration, shutdown: &AtomicBool) {
    let mut remaining = total;
    let tick = Duration::from_secs(1);
    while remaining > Duration::ZERO {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let step = tick.min(remaining);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
}
