//! Process supervisor (SPEC_FULL.md §4.1, §6).
//!
//! Spawns the queue broker, the extraction manager, and each stage's worker
//! pool as child processes, redirects their combined output to per-child
//! append-mode logs, restarts anything that exits unexpectedly, and runs a
//! graceful-stop-then-force-kill shutdown sequence on `SIGINT`/`SIGTERM`.
//! Grounded on `BackendPipeline` (`run_platform.py`): `start_component`,
//! `start_pipeline`, `monitor`, `shutdown`.
//!
//! Holds no connection to the broker or status store itself — it only
//! knows how to spawn, watch, and signal OS processes (SPEC_FULL.md §9,
//! "no hidden globals").

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(about = "Process supervisor for the document ingestion fabric")]
struct Args {
    /// Base directory of the project (working directory for spawned children).
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Directory to store per-child logs.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Reserved for parity with the original Python tooling's virtualenv
    /// activation flag. Every child here is a native binary, not a Python
    /// script run under an interpreter, so there is nothing to activate;
    /// the flag is accepted and ignored rather than silently rejected.
    #[arg(long)]
    venv: Option<String>,

    /// Port the queue broker listens on, passed through to `redis-server`
    /// when the supervisor starts it itself.
    #[arg(long, default_value_t = 6379)]
    redis_port: u16,
}

/// One managed child process: its spec (for restarting), handle, and log file.
struct ManagedChild {
    display_name: String,
    program: PathBuf,
    args: Vec<String>,
    child: Child,
}

/// `key` is `"stage"` for singletons or `"stage:worker_id"` for pool members.
struct Pipeline {
    base_dir: PathBuf,
    log_dir: PathBuf,
    bin_dir: PathBuf,
    redis_port: u16,
    children: HashMap<String, ManagedChild>,
    shutting_down: bool,
}

impl Pipeline {
    fn new(base_dir: PathBuf, log_dir: PathBuf, bin_dir: PathBuf, redis_port: u16) -> Self {
        Self {
            base_dir,
            log_dir,
            bin_dir,
            redis_port,
            children: HashMap::new(),
            shutting_down: false,
        }
    }

    /// Opens `key`'s log file in append mode, writing a restart banner if
    /// the file already has content (mirrors `start_component`'s log
    /// handling in `run_platform.py`).
    fn open_log(&self, key: &str) -> std::io::Result<std::fs::File> {
        let path = self.log_dir.join(format!("{}.log", key.replace(':', "_")));
        let existed_with_content = path.metadata().map(|m| m.len() > 0).unwrap_or(false);

        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;

        if existed_with_content {
            use std::io::Write;
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            writeln!(file, "\n{}", "=".repeat(50))?;
            writeln!(file, "Process restarted at {now}")?;
            writeln!(file, "{}", "=".repeat(50))?;
        }
        Ok(file)
    }

    /// Spawns one child, recording it under `key`. `program` is resolved
    /// relative to `self.bin_dir` when it isn't already absolute.
    fn start(&mut self, key: &str, display_name: &str, program: &str, args: &[String]) -> anyhow::Result<()> {
        let program_path = self.bin_dir.join(program);
        let log_file = self.open_log(key)?;
        let log_path = self.log_dir.join(format!("{}.log", key.replace(':', "_")));
        let stderr_file = log_file.try_clone()?;

        info!(component = display_name, "starting component");

        let child = Command::new(&program_path)
            .args(args)
            .current_dir(&self.base_dir)
            .stdout(std::process::Stdio::from(log_file))
            .stderr(std::process::Stdio::from(stderr_file))
            .kill_on_drop(true)
            .spawn()?;

        info!(component = display_name, pid = ?child.id(), log = %log_path.display(), "component started");

        self.children.insert(
            key.to_string(),
            ManagedChild {
                display_name: display_name.to_string(),
                program: program_path,
                args: args.to_vec(),
                child,
            },
        );
        Ok(())
    }

    /// Attempts to start `redis-server` on the configured port. Failure is
    /// logged but not fatal: per SPEC_FULL.md §4.1 the supervisor "starts
    /// the queue broker, or assumes it reachable" if one is already running
    /// elsewhere.
    fn start_broker(&mut self) {
        let log_file = match self.open_log("redis") {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "could not open redis log file, skipping broker spawn");
                return;
            }
        };
        let stderr_file = match log_file.try_clone() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "could not clone redis log handle, skipping broker spawn");
                return;
            }
        };

        match Command::new("redis-server")
            .arg("--port")
            .arg(self.redis_port.to_string())
            .current_dir(&self.base_dir)
            .stdout(std::process::Stdio::from(log_file))
            .stderr(std::process::Stdio::from(stderr_file))
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => {
                info!(port = self.redis_port, pid = ?child.id(), "redis broker started");
                self.children.insert(
                    "redis".to_string(),
                    ManagedChild {
                        display_name: "redis".to_string(),
                        program: "redis-server".into(),
                        args: vec!["--port".to_string(), self.redis_port.to_string()],
                        child,
                    },
                );
            }
            Err(e) => {
                warn!(error = %e, "redis-server not found on this host, assuming the broker is reachable elsewhere");
            }
        }
    }

    async fn start_manager(&mut self) -> anyhow::Result<()> {
        self.start("extraction-manager", "extraction-manager", "manager", &[])
    }

    fn start_worker_pool(&mut self, stage: &str, program: &str, count: usize) -> anyhow::Result<()> {
        for i in 0..count {
            let worker_id = format!("{stage}-{i}");
            let key = format!("{stage}:{worker_id}");
            self.start(&key, &key, program, &["--worker-id".to_string(), worker_id])?;
        }
        Ok(())
    }

    /// Polls every child for a non-zero-cost liveness check, restarting
    /// anything unexpected.
    async fn poll_once(&mut self) {
        let keys: Vec<String> = self.children.keys().cloned().collect();
        for key in keys {
            let exited = {
                let Some(managed) = self.children.get_mut(&key) else {
                    continue;
                };
                match managed.child.try_wait() {
                    Ok(Some(status)) => Some(status),
                    Ok(None) => None,
                    Err(e) => {
                        error!(component = %managed.display_name, error = %e, "failed to poll child status");
                        None
                    }
                }
            };

            let Some(status) = exited else { continue };

            let managed = self.children.remove(&key).expect("just observed via get_mut");
            if !status.success() {
                warn!(component = %managed.display_name, code = ?status.code(), "component exited unexpectedly");
            }

            if key == "redis" {
                info!(component = %managed.display_name, "broker exited, not restarting");
                continue;
            }
            if key == "extraction-manager" && status.success() && self.shutting_down {
                info!("manager exited cleanly during shutdown, not restarting");
                continue;
            }

            info!(component = %managed.display_name, "restarting component");
            if let Err(e) = self.start(&key, &managed.display_name, &managed.program.to_string_lossy(), &managed.args) {
                error!(component = %managed.display_name, error = %e, "failed to restart component");
            }
        }
    }

    /// Sends `SIGTERM` to every live child, waits up to `grace_period` for
    /// clean exits, then `SIGKILL`s anything still alive.
    async fn shutdown(&mut self, grace_period: Duration) {
        self.shutting_down = true;
        info!("shutting down pipeline components");

        for managed in self.children.values() {
            if let Some(pid) = managed.child.id() {
                info!(component = %managed.display_name, pid, "sending SIGTERM");
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
        }

        let deadline = tokio::time::Instant::now() + grace_period;
        loop {
            let all_exited = {
                let mut all_exited = true;
                for managed in self.children.values_mut() {
                    if managed.child.try_wait().ok().flatten().is_none() {
                        all_exited = false;
                    }
                }
                all_exited
            };
            if all_exited || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        for managed in self.children.values_mut() {
            if managed.child.try_wait().ok().flatten().is_none() {
                warn!(component = %managed.display_name, "did not exit gracefully, killing");
                let _ = managed.child.kill().await;
            }
        }

        info!("all processes terminated");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codetriever_common::init::initialize_environment();
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if args.venv.is_some() {
        warn!("--venv was provided but has no effect: every component here is a native binary, not a Python script");
    }

    let config = codetriever_config::ApplicationConfig::from_env()?;
    config.ensure_directories()?;

    let base_dir = args.base_dir.unwrap_or(std::env::current_dir()?);
    let log_dir = args.log_dir.unwrap_or_else(|| config.supervisor.log_dir.clone());
    std::fs::create_dir_all(&log_dir)?;

    let bin_dir = sibling_binary_dir()?;

    let mut pipeline = Pipeline::new(base_dir, log_dir, bin_dir, args.redis_port);

    info!("starting multi-worker backend pipeline");
    pipeline.start_broker();
    pipeline.start_manager().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    pipeline.start_worker_pool("extraction-worker", "extract_worker", config.workers.extraction_workers)?;
    pipeline.start_worker_pool("chunking-worker", "chunk_worker", config.workers.chunking_workers)?;
    pipeline.start_worker_pool("embedding-worker", "embed_worker", config.workers.embedding_workers)?;

    info!(
        extraction_workers = config.workers.extraction_workers,
        chunking_workers = config.workers.chunking_workers,
        embedding_workers = config.workers.embedding_workers,
        "all pipeline components started"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "failed to install signal handlers");
        }
        shutdown_signal.store(true, Ordering::Relaxed);
    });

    let poll_interval = Duration::from_secs(config.supervisor.poll_interval_secs);
    let mut since_last_poll = Duration::ZERO;
    let tick = Duration::from_secs(1);
    while !shutdown.load(Ordering::Relaxed) {
        tokio::time::sleep(tick).await;
        since_last_poll += tick;
        if since_last_poll >= poll_interval {
            since_last_poll = Duration::ZERO;
            pipeline.poll_once().await;
        }
    }

    pipeline
        .shutdown(Duration::from_secs(config.supervisor.shutdown_grace_period_secs))
        .await;

    info!("supervisor exiting");
    Ok(())
}

/// Blocks until `SIGINT` or `SIGTERM`.
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
    Ok(())
}

/// Binaries built by this workspace land together (`target/<profile>/`), so
/// the manager/worker binaries are found next to the supervisor's own executable.
fn sibling_binary_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("supervisor executable has no parent directory"))?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_key_sanitizes_colon_for_filename() {
        let key = "extraction-worker:extraction-worker-0";
        let sanitized = key.replace(':', "_");
        assert_eq!(sanitized, "extraction-worker_extraction-worker-0");
    }
}
