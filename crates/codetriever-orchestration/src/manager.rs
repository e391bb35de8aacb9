//! Scan-claim-dispatch manager (SPEC_FULL.md §4.2).
//!
//! Periodically lists the watched library directory, skips anything already
//! processed or locked, claims the rest with an expiring lock, and dispatches
//! one extract job per newly claimed file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use codetriever_broker::{QueueBroker, extraction_lock_key};
use codetriever_common::TraceId;
use codetriever_status::{Status, StatusStore};
use tracing::{info, warn};

use crate::error::OrchestrationResult;
use crate::jobs::{ExtractJob, MetadataHint};

const MANAGER_ID: &str = "extraction-manager";

/// Outcome of a single directory scan, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub files_found: usize,
    pub jobs_created: usize,
    pub files_skipped: usize,
}

/// Scans `library_dir` for admissible, unclaimed files and dispatches an
/// extract job for each one it successfully claims.
pub struct ExtractionManager {
    broker: Arc<dyn QueueBroker>,
    status: Arc<dyn StatusStore>,
    lock_ttl: Duration,
    supported_extensions: Vec<String>,
    extraction_jobs_queue: String,
}

impl ExtractionManager {
    #[must_use]
    pub fn new(
        broker: Arc<dyn QueueBroker>,
        status: Arc<dyn StatusStore>,
        lock_ttl: Duration,
        supported_extensions: Vec<String>,
        extraction_jobs_queue: String,
    ) -> Self {
        Self {
            broker,
            status,
            lock_ttl,
            supported_extensions,
            extraction_jobs_queue,
        }
    }

    /// Runs one scan of `library_dir`, claiming and dispatching any eligible
    /// file. Returns a summary; never panics on a missing directory entry.
    ///
    /// # Errors
    /// Returns a [`crate::OrchestrationError`] if a broker or status-store
    /// call fails outright (not merely "already claimed").
    pub async fn scan_once(&self, library_dir: &Path) -> OrchestrationResult<ScanSummary> {
        let mut summary = ScanSummary::default();

        let entries = match std::fs::read_dir(library_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %library_dir.display(), error = %e, "master library scan failed to read directory");
                return Ok(summary);
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !self.is_admissible(&path) {
                continue;
            }
            summary.files_found += 1;

            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let filepath = path.to_string_lossy().to_string();

            if self.is_already_processed(&filepath).await? {
                summary.files_skipped += 1;
                continue;
            }

            if !self.claim(&filename).await? {
                summary.files_skipped += 1;
                continue;
            }

            self.dispatch(&filename, &filepath).await?;
            summary.jobs_created += 1;
        }

        info!(
            files_found = summary.files_found,
            jobs_created = summary.jobs_created,
            files_skipped = summary.files_skipped,
            "master library scan complete"
        );
        Ok(summary)
    }

    fn is_admissible(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.supported_extensions.iter().any(|s| s.eq_ignore_ascii_case(ext)))
    }

    async fn is_already_processed(&self, filepath: &str) -> OrchestrationResult<bool> {
        match self.status.get_status(filepath).await? {
            Some(Status::Processing | Status::Processed) => Ok(true),
            _ => Ok(false),
        }
    }

    async fn claim(&self, filename: &str) -> OrchestrationResult<bool> {
        let key = extraction_lock_key(filename);
        let claimed = self.broker.set_if_absent(&key, MANAGER_ID, self.lock_ttl).await?;
        Ok(claimed)
    }

    async fn dispatch(&self, filename: &str, filepath: &str) -> OrchestrationResult<()> {
        let trace_id = TraceId::new().to_string();

        self.status
            .add(filename, filepath, Status::Queued, &trace_id)
            .await?;

        let job = ExtractJob {
            trace_id,
            file_path: filepath.to_string(),
            filename: filename.to_string(),
            job_timestamp: unix_timestamp(),
            metadata_hint: MetadataHint {
                source: "master_library".to_string(),
                manager_id: MANAGER_ID.to_string(),
            },
        };

        let payload = serde_json::to_string(&job)?;
        self.broker.push(&self.extraction_jobs_queue, &payload).await?;
        Ok(())
    }
}

fn unix_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetriever_broker::FakeBroker;
    use codetriever_status::MockStatusStore;
    use std::io::Write;

    fn manager(broker: Arc<FakeBroker>, status: Arc<MockStatusStore>) -> ExtractionManager {
        ExtractionManager::new(
            broker,
            status,
            Duration::from_secs(300),
            vec!["pdf".to_string()],
            "extraction_jobs".to_string(),
        )
    }

    fn touch(dir: &Path, name: &str) {
        let mut f = std::fs::File::create(dir.join(name)).expect("create");
        writeln!(f, "content").expect("write");
    }

    #[tokio::test]
    async fn dispatches_one_job_per_admissible_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "report.pdf");
        touch(dir.path(), "notes.txt");

        let broker = Arc::new(FakeBroker::new());
        let status = Arc::new(MockStatusStore::new());
        let mgr = manager(broker.clone(), status.clone());

        let summary = mgr.scan_once(dir.path()).await.expect("scan");
        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.jobs_created, 1);

        let popped = broker
            .blocking_pop("extraction_jobs", Duration::from_millis(10))
            .await
            .expect("pop")
            .expect("job present");
        let job: ExtractJob = serde_json::from_str(&popped).expect("parse");
        assert_eq!(job.filename, "report.pdf");
    }

    #[tokio::test]
    async fn skips_files_already_locked() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "report.pdf");

        let broker = Arc::new(FakeBroker::new());
        broker
            .set_if_absent(&extraction_lock_key("report.pdf"), "someone-else", Duration::from_secs(60))
            .await
            .expect("lock");
        let status = Arc::new(MockStatusStore::new());
        let mgr = manager(broker, status);

        let summary = mgr.scan_once(dir.path()).await.expect("scan");
        assert_eq!(summary.jobs_created, 0);
        assert_eq!(summary.files_skipped, 1);
    }

    #[tokio::test]
    async fn skips_files_already_processed() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "report.pdf");
        let filepath = dir.path().join("report.pdf").to_string_lossy().to_string();

        let broker = Arc::new(FakeBroker::new());
        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", &filepath, Status::Processed, "trace-1")
            .await
            .expect("add");
        let mgr = manager(broker, status);

        let summary = mgr.scan_once(dir.path()).await.expect("scan");
        assert_eq!(summary.jobs_created, 0);
        assert_eq!(summary.files_skipped, 1);
    }

    #[tokio::test]
    async fn ignores_unsupported_extensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "notes.txt");

        let broker = Arc::new(FakeBroker::new());
        let status = Arc::new(MockStatusStore::new());
        let mgr = manager(broker, status);

        let summary = mgr.scan_once(dir.path()).await.expect("scan");
        assert_eq!(summary.files_found, 0);
    }
}
