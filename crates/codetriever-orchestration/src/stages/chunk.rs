//! Chunk stage (SPEC_FULL.md §4.4): structured document to token-bounded
//! chunks, staged to disk for the embed worker.
//!
//! Makes no status-store write: the original platform never updates status
//! at this stage either, and SPEC_FULL.md's redesign keeps that contract
//! (only the extract worker's `processing` and the embed worker's terminal
//! `processed`/`error` touch the status store).

use std::path::Path;
use std::sync::Arc;

use codetriever_broker::QueueBroker;
use codetriever_chunking::{HybridChunker, HybridChunkerConfig, TokenCounter, write_staging_atomic};
use codetriever_extraction::{DocumentBlock, StructuredDocument};
use tracing::info;

use crate::error::{OrchestrationError, OrchestrationResult};
use crate::jobs::{ChunkJob, EmbedJob};

pub struct ChunkStage<C: TokenCounter> {
    chunker: HybridChunker<C>,
    broker: Arc<dyn QueueBroker>,
    embed_jobs_queue: String,
    processed_dir: std::path::PathBuf,
}

impl<C: TokenCounter> ChunkStage<C> {
    #[must_use]
    pub fn new(
        counter: C,
        config: HybridChunkerConfig,
        broker: Arc<dyn QueueBroker>,
        embed_jobs_queue: String,
        processed_dir: std::path::PathBuf,
    ) -> Self {
        Self {
            chunker: HybridChunker::new(counter, config),
            broker,
            embed_jobs_queue,
            processed_dir,
        }
    }

    /// Rebuilds the structured document (or falls back to a single block
    /// from the markdown), chunks it, writes the staging artifact, and
    /// dispatches one embed job.
    ///
    /// # Errors
    /// Returns an [`OrchestrationError`] if reconstruction, chunking, the
    /// staging write, or the queue push fails.
    pub async fn process_job(&self, job: ChunkJob) -> OrchestrationResult<()> {
        info!(trace_id = %job.trace_id, file = %job.filename, "chunk job starting");

        let document = reconstruct_document(&job)?;
        let chunks = self.chunker.chunk(&document);

        let basename = Path::new(&job.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| job.filename.clone());

        let metadata = enrich_metadata(job.metadata.clone(), chunks.len());

        let staged_path = write_staging_atomic(&self.processed_dir, &basename, &chunks, &metadata)?;

        let embed_job = EmbedJob {
            chunks_file_reference: staged_path.display().to_string(),
            metadata,
        };

        let payload = serde_json::to_string(&embed_job)?;
        self.broker.push(&self.embed_jobs_queue, &payload).await?;
        Ok(())
    }
}

fn reconstruct_document(job: &ChunkJob) -> OrchestrationResult<StructuredDocument> {
    if let Some(value) = &job.document_serialized {
        return serde_json::from_value(value.clone()).map_err(OrchestrationError::from);
    }

    if job.markdown_fallback.trim().is_empty() {
        return Err(OrchestrationError::MalformedJob(format!(
            "chunk job for {} has neither document_serialized nor a usable markdown_fallback",
            job.filename
        )));
    }

    Ok(StructuredDocument::new(
        vec![DocumentBlock {
            text: job.markdown_fallback.clone(),
            section_path: Vec::new(),
            page: None,
        }],
        std::collections::HashMap::new(),
    ))
}

fn enrich_metadata(mut metadata: serde_json::Value, chunks_count: usize) -> serde_json::Value {
    let now = chrono::Utc::now();
    if let serde_json::Value::Object(map) = &mut metadata {
        map.insert("chunks_count".to_string(), serde_json::json!(chunks_count));
        map.insert("chunking_timestamp".to_string(), serde_json::json!(now.timestamp() as f64));
        map.insert("chunking_time".to_string(), serde_json::json!(now.to_rfc3339()));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetriever_broker::FakeBroker;
    use codetriever_chunking::TiktokenCounter;
    use std::time::Duration;

    fn job(document_serialized: Option<serde_json::Value>, markdown_fallback: &str) -> ChunkJob {
        ChunkJob {
            trace_id: "trace-1".to_string(),
            file_path: "/lib/report.pdf".to_string(),
            filename: "report.pdf".to_string(),
            document_serialized,
            markdown_fallback: markdown_fallback.to_string(),
            metadata: serde_json::json!({"title": "Report", "file_path": "/lib/report.pdf"}),
            extraction_timestamp: 0.0,
            producer_worker_id: "extract-worker-1".to_string(),
        }
    }

    fn stage(dir: &Path) -> ChunkStage<TiktokenCounter> {
        ChunkStage::new(
            TiktokenCounter::for_budget(8191).expect("encoder"),
            HybridChunkerConfig {
                max_tokens: 8191,
                merge_peers: true,
            },
            Arc::new(FakeBroker::new()),
            "embed_jobs".to_string(),
            dir.to_path_buf(),
        )
    }

    #[tokio::test]
    async fn chunks_from_serialized_document_and_stages_for_embed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let document = StructuredDocument::new(
            vec![DocumentBlock {
                text: "hello world".to_string(),
                section_path: vec!["Intro".to_string()],
                page: Some(1),
            }],
            std::collections::HashMap::new(),
        );
        let input = job(Some(serde_json::to_value(&document).expect("ser")), "");
        let broker = Arc::new(FakeBroker::new());
        let stage = ChunkStage::new(
            TiktokenCounter::for_budget(8191).expect("encoder"),
            HybridChunkerConfig {
                max_tokens: 8191,
                merge_peers: true,
            },
            broker.clone(),
            "embed_jobs".to_string(),
            dir.path().to_path_buf(),
        );

        stage.process_job(input).await.expect("process");

        let popped = broker
            .blocking_pop("embed_jobs", Duration::from_millis(10))
            .await
            .expect("pop")
            .expect("present");
        let embed_job: EmbedJob = serde_json::from_str(&popped).expect("parse");
        assert!(std::path::Path::new(&embed_job.chunks_file_reference).exists());
        assert_eq!(embed_job.metadata["chunks_count"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn falls_back_to_markdown_when_document_serialized_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = job(None, "plain text body");
        let stage = stage(dir.path());
        stage.process_job(input).await.expect("process");
    }

    #[tokio::test]
    async fn malformed_job_with_no_usable_content_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = job(None, "");
        let stage = stage(dir.path());
        let result = stage.process_job(input).await;
        assert!(result.is_err());
    }
}
