//! Extract stage (SPEC_FULL.md §4.3): PDF (or other converter) to
//! structured document, handed off to the chunk stage.
//!
//! Sets status to `processing` only. `processed` is reserved for the embed
//! worker's terminal success update (SPEC_FULL.md §9, "Status processed
//! ambiguity — decision").

use std::sync::Arc;

use codetriever_broker::{QueueBroker, extraction_lock_key};
use codetriever_extraction::{DocumentConverter, build_metadata};
use codetriever_status::{Status, StatusStore};
use tracing::{error, info};

use crate::error::OrchestrationResult;
use crate::jobs::{ChunkJob, ExtractJob};

/// Processes one extract job end to end: convert, build metadata, dispatch
/// to the chunk queue, release the claim lock.
pub struct ExtractStage {
    converter: Arc<dyn DocumentConverter>,
    status: Arc<dyn StatusStore>,
    broker: Arc<dyn QueueBroker>,
    chunk_jobs_queue: String,
    worker_id: String,
}

impl ExtractStage {
    #[must_use]
    pub fn new(
        converter: Arc<dyn DocumentConverter>,
        status: Arc<dyn StatusStore>,
        broker: Arc<dyn QueueBroker>,
        chunk_jobs_queue: String,
        worker_id: String,
    ) -> Self {
        Self {
            converter,
            status,
            broker,
            chunk_jobs_queue,
            worker_id,
        }
    }

    /// Runs one job: sets `processing`, converts the file, pushes a chunk
    /// job, releases the lock. On any failure, records `error` on the status
    /// store and still releases the lock so the manager can reclaim the file
    /// after an operator requeue.
    ///
    /// # Errors
    /// Returns the underlying [`crate::OrchestrationError`] after recording
    /// the failure on the status store.
    pub async fn process_job(&self, job: ExtractJob) -> OrchestrationResult<()> {
        info!(trace_id = %job.trace_id, file = %job.filename, "extract job starting");

        if let Err(e) = self.status.update(&job.file_path, Status::Processing, None).await {
            error!(trace_id = %job.trace_id, error = %e, "failed to mark document processing");
        }

        let outcome = self.run(&job).await;

        if let Err(e) = &outcome {
            error!(trace_id = %job.trace_id, file = %job.filename, error = %e, "extract job failed");
            let _ = self
                .status
                .update(&job.file_path, Status::Error, Some(&e.to_string()))
                .await;
        }

        let lock_key = extraction_lock_key(&job.filename);
        if let Err(e) = self.broker.delete(&lock_key).await {
            error!(trace_id = %job.trace_id, error = %e, "failed to release extraction lock");
        }

        outcome
    }

    async fn run(&self, job: &ExtractJob) -> OrchestrationResult<()> {
        let path = std::path::Path::new(&job.file_path);
        let converted = self.converter.convert(path)?;
        let metadata = build_metadata(path, &converted.document.doc_metadata, &job.trace_id);

        let chunk_job = ChunkJob {
            trace_id: job.trace_id.clone(),
            file_path: job.file_path.clone(),
            filename: job.filename.clone(),
            document_serialized: Some(serde_json::to_value(&converted.document)?),
            markdown_fallback: converted.markdown,
            metadata: serde_json::to_value(&metadata)?,
            extraction_timestamp: unix_timestamp(),
            producer_worker_id: self.worker_id.clone(),
        };

        let payload = serde_json::to_string(&chunk_job)?;
        self.broker.push(&self.chunk_jobs_queue, &payload).await?;
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
    use codetriever_extraction::{ConvertedDocument, DocumentBlock, ExtractError, ExtractResult, StructuredDocument};
    use codetriever_status::MockStatusStore;
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    struct StubConverter {
        fail: bool,
    }

    impl DocumentConverter for StubConverter {
        fn convert(&self, _path: &Path) -> ExtractResult<ConvertedDocument> {
            if self.fail {
                return Err(ExtractError::EmptyDocument {
                    path: "stub".to_string(),
                });
            }
            Ok(ConvertedDocument {
                document: StructuredDocument::new(
                    vec![DocumentBlock {
                        text: "hello world".to_string(),
                        section_path: vec![],
                        page: Some(1),
                    }],
                    HashMap::new(),
                ),
                markdown: "hello world".to_string(),
            })
        }
    }

    fn job() -> ExtractJob {
        ExtractJob {
            trace_id: "trace-1".to_string(),
            file_path: "/lib/report.pdf".to_string(),
            filename: "report.pdf".to_string(),
            job_timestamp: 0.0,
            metadata_hint: crate::jobs::MetadataHint {
                source: "master_library".to_string(),
                manager_id: "extraction-manager".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn success_pushes_chunk_job_and_releases_lock_without_marking_processed() {
        let broker = Arc::new(FakeBroker::new());
        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", "/lib/report.pdf", Status::Queued, "trace-1")
            .await
            .expect("seed");
        broker
            .set_if_absent(&extraction_lock_key("report.pdf"), "extraction-manager", Duration::from_secs(60))
            .await
            .expect("lock");

        let stage = ExtractStage::new(
            Arc::new(StubConverter { fail: false }),
            status.clone(),
            broker.clone(),
            "chunk_jobs".to_string(),
            "extract-worker-1".to_string(),
        );

        stage.process_job(job()).await.expect("process");

        assert!(!broker.exists(&extraction_lock_key("report.pdf")).await.expect("exists"));
        assert_eq!(
            status.get_status("/lib/report.pdf").await.expect("status"),
            Some(Status::Processing)
        );

        let popped = broker
            .blocking_pop("chunk_jobs", Duration::from_millis(10))
            .await
            .expect("pop")
            .expect("present");
        let chunk_job: ChunkJob = serde_json::from_str(&popped).expect("parse");
        assert!(chunk_job.document_serialized.is_some());
    }

    #[tokio::test]
    async fn failure_marks_error_and_still_releases_lock() {
        let broker = Arc::new(FakeBroker::new());
        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", "/lib/report.pdf", Status::Queued, "trace-1")
            .await
            .expect("seed");
        broker
            .set_if_absent(&extraction_lock_key("report.pdf"), "extraction-manager", Duration::from_secs(60))
            .await
            .expect("lock");

        let stage = ExtractStage::new(
            Arc::new(StubConverter { fail: true }),
            status.clone(),
            broker.clone(),
            "chunk_jobs".to_string(),
            "extract-worker-1".to_string(),
        );

        let result = stage.process_job(job()).await;
        assert!(result.is_err());
        assert!(!broker.exists(&extraction_lock_key("report.pdf")).await.expect("exists"));
        assert_eq!(
            status.get_status("/lib/report.pdf").await.expect("status"),
            Some(Status::Error)
        );
    }
}
