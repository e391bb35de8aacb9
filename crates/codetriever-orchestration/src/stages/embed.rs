//! Embed stage (SPEC_FULL.md §4.5): staged chunks to embeddings to the
//! vector store, and the pipeline's one terminal status update.
//!
//! Performs the only `processed` transition in the whole pipeline
//! (SPEC_FULL.md §9): success here is what completes a document's journey.
//! A failure at this stage — or any earlier one, surfaced back here via the
//! extract/chunk stages' own `error` updates — leaves the document in
//! `error`, from which only an operator-driven requeue advances it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use codetriever_embeddings::EmbeddingService;
use codetriever_status::{Status, StatusStore};
use codetriever_vector_data::{EnrichedChunk, ProcessingInfo, VectorInfo, VectorStorage, VectorStoreRecord};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{OrchestrationError, OrchestrationResult};
use crate::jobs::{EmbedJob, derive_document_id};

/// Fields copied from document metadata onto every chunk's
/// `important_fields`, mirroring `embedding.py`'s `important_fields` list.
const IMPORTANT_FIELDS: &[&str] = &[
    "file_path", "title", "author", "date", "source", "url", "doc_type", "category", "tags", "language",
];

/// Keys tried in order when looking for the chunk array in a staging file.
/// The chunk stage here always writes `chunks`; the rest are read-only
/// compatibility for staging files from an older or external writer.
const CHUNKS_KEYS: &[&str] = &["chunks", "documents", "items", "texts"];

#[derive(Debug, Deserialize)]
struct StagingArtifact {
    #[serde(default)]
    metadata: serde_json::Value,
    #[serde(flatten)]
    rest: serde_json::Value,
}

impl StagingArtifact {
    /// Resolves the chunk list through [`CHUNKS_KEYS`], then each chunk's
    /// text through `chunk.text` if the entry is an object, or the entry
    /// itself if it's a plain string (SPEC_FULL.md §4.5 step 1/3).
    fn chunk_texts(&self) -> OrchestrationResult<Vec<String>> {
        let entries = CHUNKS_KEYS
            .iter()
            .find_map(|key| self.rest.get(*key).and_then(serde_json::Value::as_array))
            .ok_or_else(|| {
                OrchestrationError::MalformedJob(format!(
                    "staging artifact has none of the recognized chunk keys ({})",
                    CHUNKS_KEYS.join(", ")
                ))
            })?;

        Ok(entries
            .iter()
            .filter_map(|entry| match entry {
                serde_json::Value::Object(_) => entry.get("text").and_then(|v| v.as_str()).map(str::to_string),
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }
}

pub struct EmbedStage {
    embeddings: Arc<dyn EmbeddingService>,
    vector_storage: Arc<dyn VectorStorage>,
    status: Arc<dyn StatusStore>,
}

impl EmbedStage {
    #[must_use]
    pub fn new(
        embeddings: Arc<dyn EmbeddingService>,
        vector_storage: Arc<dyn VectorStorage>,
        status: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            embeddings,
            vector_storage,
            status,
        }
    }

    /// Loads the staged chunks, embeds them in one batch, upserts a single
    /// [`VectorStoreRecord`] for the document, and records the terminal
    /// status.
    ///
    /// # Errors
    /// Returns an [`OrchestrationError`] after recording `error` on the
    /// status store.
    pub async fn process_job(&self, job: EmbedJob) -> OrchestrationResult<()> {
        info!(chunks_file = %job.chunks_file_reference, "embed job starting");

        let file_path = job
            .metadata
            .get("file_path")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let outcome = self.run(&job).await;

        if let Err(e) = &outcome {
            error!(chunks_file = %job.chunks_file_reference, error = %e, "embed job failed");
            if let Some(path) = &file_path {
                let _ = self.status.update(path, Status::Error, Some(&e.to_string())).await;
            }
            return outcome;
        }

        if let Some(path) = &file_path {
            self.status.update(path, Status::Processed, None).await?;
        }
        outcome
    }

    async fn run(&self, job: &EmbedJob) -> OrchestrationResult<()> {
        let raw = std::fs::read_to_string(&job.chunks_file_reference)?;
        let staged: StagingArtifact = serde_json::from_str(&raw)?;

        let chunk_texts = staged.chunk_texts()?;
        if chunk_texts.is_empty() {
            return Err(OrchestrationError::MalformedJob(format!(
                "staging artifact {} has no chunks",
                job.chunks_file_reference
            )));
        }

        let metadata = merge_metadata(staged.metadata, job.metadata.clone());
        let document_id = metadata
            .get("document_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| {
                let file_path = metadata.get("file_path").and_then(|v| v.as_str()).unwrap_or_default();
                derive_document_id(file_path)
            });

        let texts: Vec<&str> = chunk_texts.iter().map(String::as_str).collect();
        let embeddings = self.embeddings.generate_embeddings(texts).await?;
        let model_name = self.embeddings.provider().model_name().to_string();

        let important_fields = extract_important_fields(&metadata);

        let embedded_chunks: Vec<EnrichedChunk> = chunk_texts
            .into_iter()
            .zip(embeddings.iter())
            .enumerate()
            .map(|(index, (text, embedding))| EnrichedChunk {
                text,
                chunk_index: index,
                embedding: embedding.clone(),
                important_fields: important_fields.clone(),
            })
            .collect();

        let dimensions = self.embeddings.provider().embedding_dimension();
        let record = VectorStoreRecord {
            document_id,
            metadata,
            vectors: VectorInfo {
                count: embedded_chunks.len(),
                dimensions,
                model: model_name.clone(),
            },
            embedded_chunks,
            processing: ProcessingInfo {
                embedding_timestamp: Utc::now(),
                embedding_time: 0.0,
                storage_type: "qdrant".to_string(),
            },
        };

        self.vector_storage.upsert_document(&record).await?;
        Ok(())
    }
}

fn merge_metadata(file_metadata: serde_json::Value, job_metadata: serde_json::Value) -> serde_json::Value {
    let mut merged = match file_metadata {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    if let serde_json::Value::Object(job_map) = job_metadata {
        for (key, value) in job_map {
            merged.insert(key, value);
        }
    }
    serde_json::Value::Object(merged)
}

fn extract_important_fields(metadata: &serde_json::Value) -> HashMap<String, serde_json::Value> {
    let mut fields = HashMap::new();
    for key in IMPORTANT_FIELDS {
        if let Some(value) = metadata.get(*key) {
            fields.insert((*key).to_string(), value.clone());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codetriever_embeddings::{EmbeddingError, EmbeddingProvider, EmbeddingResult, EmbeddingStats};
    use codetriever_status::MockStatusStore;
    use codetriever_vector_data::MockStorage;

    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2]).collect())
        }
        fn embedding_dimension(&self) -> usize {
            2
        }
        fn max_tokens(&self) -> usize {
            8191
        }
        fn model_name(&self) -> &str {
            "stub-model"
        }
        async fn is_ready(&self) -> bool {
            true
        }
        async fn ensure_ready(&self) -> EmbeddingResult<()> {
            Ok(())
        }
        async fn get_tokenizer(&self) -> Option<std::sync::Arc<tokenizers::Tokenizer>> {
            None
        }
    }

    struct StubService(StubProvider);

    #[async_trait]
    impl EmbeddingService for StubService {
        async fn generate_embeddings(&self, texts: Vec<&str>) -> EmbeddingResult<Vec<Vec<f32>>> {
            self.0.embed_batch(&texts).await
        }
        fn provider(&self) -> &dyn EmbeddingProvider {
            &self.0
        }
        async fn get_stats(&self) -> EmbeddingStats {
            EmbeddingStats::default()
        }
    }

    fn write_staging(dir: &std::path::Path, chunks_count: usize) -> String {
        let chunks: Vec<_> = (0..chunks_count)
            .map(|i| serde_json::json!({"text": format!("chunk {i}"), "section_path": []}))
            .collect();
        let body = serde_json::json!({
            "chunks": chunks,
            "metadata": {"file_path": "/lib/report.pdf", "title": "Report"},
        });
        let path = dir.join("report_chunks.json");
        std::fs::write(&path, serde_json::to_vec(&body).expect("ser")).expect("write");
        path.display().to_string()
    }

    #[tokio::test]
    async fn success_upserts_once_and_marks_processed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let chunks_file = write_staging(dir.path(), 3);

        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", "/lib/report.pdf", Status::Processing, "trace-1")
            .await
            .expect("seed");

        let storage = Arc::new(MockStorage::new());
        let stage = EmbedStage::new(Arc::new(StubService(StubProvider)), storage.clone(), status.clone());

        let job = EmbedJob {
            chunks_file_reference: chunks_file,
            metadata: serde_json::json!({"file_path": "/lib/report.pdf", "trace_id": "trace-1"}),
        };

        stage.process_job(job).await.expect("process");

        assert_eq!(
            status.get_status("/lib/report.pdf").await.expect("status"),
            Some(Status::Processed)
        );
    }

    #[tokio::test]
    async fn empty_staging_file_is_rejected_and_marks_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let chunks_file = write_staging(dir.path(), 0);

        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", "/lib/report.pdf", Status::Processing, "trace-1")
            .await
            .expect("seed");

        let storage = Arc::new(MockStorage::new());
        let stage = EmbedStage::new(Arc::new(StubService(StubProvider)), storage, status.clone());

        let job = EmbedJob {
            chunks_file_reference: chunks_file,
            metadata: serde_json::json!({"file_path": "/lib/report.pdf"}),
        };

        let result = stage.process_job(job).await;
        assert!(result.is_err());
        assert_eq!(
            status.get_status("/lib/report.pdf").await.expect("status"),
            Some(Status::Error)
        );
    }

    #[tokio::test]
    async fn persisted_record_carries_trace_id_from_job_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let chunks_file = write_staging(dir.path(), 2);

        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", "/lib/report.pdf", Status::Processing, "trace-1")
            .await
            .expect("seed");

        let storage = Arc::new(MockStorage::new());
        let stage = EmbedStage::new(Arc::new(StubService(StubProvider)), storage.clone(), status.clone());

        let job = EmbedJob {
            chunks_file_reference: chunks_file,
            metadata: serde_json::json!({
                "file_path": "/lib/report.pdf",
                "document_id": "doc_trace_test",
                "trace_id": "trace-1",
            }),
        };

        stage.process_job(job).await.expect("process");

        let record = storage.get("doc_trace_test").expect("record persisted under explicit document_id");
        assert_eq!(record.metadata["trace_id"], serde_json::json!("trace-1"));
    }

    #[tokio::test]
    async fn accepts_legacy_documents_key_in_place_of_chunks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = serde_json::json!({
            "documents": [{"text": "legacy chunk one"}, {"text": "legacy chunk two"}],
            "metadata": {"file_path": "/lib/report.pdf", "document_id": "doc_legacy"},
        });
        let path = dir.path().join("legacy_chunks.json");
        std::fs::write(&path, serde_json::to_vec(&body).expect("ser")).expect("write");

        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", "/lib/report.pdf", Status::Processing, "trace-1")
            .await
            .expect("seed");

        let storage = Arc::new(MockStorage::new());
        let stage = EmbedStage::new(Arc::new(StubService(StubProvider)), storage.clone(), status.clone());

        let job = EmbedJob {
            chunks_file_reference: path.display().to_string(),
            metadata: serde_json::json!({"file_path": "/lib/report.pdf"}),
        };

        stage.process_job(job).await.expect("process");

        let record = storage.get("doc_legacy").expect("record persisted under explicit document_id");
        assert_eq!(record.embedded_chunks.len(), 2);
        assert_eq!(record.embedded_chunks[0].text, "legacy chunk one");
    }

    #[tokio::test]
    async fn accepts_legacy_texts_key_with_plain_string_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = serde_json::json!({
            "texts": ["plain one", "plain two"],
            "metadata": {"file_path": "/lib/report.pdf", "document_id": "doc_plain"},
        });
        let path = dir.path().join("plain_chunks.json");
        std::fs::write(&path, serde_json::to_vec(&body).expect("ser")).expect("write");

        let status = Arc::new(MockStatusStore::new());
        status
            .add("report.pdf", "/lib/report.pdf", Status::Processing, "trace-1")
            .await
            .expect("seed");

        let storage = Arc::new(MockStorage::new());
        let stage = EmbedStage::new(Arc::new(StubService(StubProvider)), storage.clone(), status.clone());

        let job = EmbedJob {
            chunks_file_reference: path.display().to_string(),
            metadata: serde_json::json!({"file_path": "/lib/report.pdf"}),
        };

        stage.process_job(job).await.expect("process");

        let record = storage.get("doc_plain").expect("record persisted under explicit document_id");
        assert_eq!(record.embedded_chunks.len(), 2);
        assert_eq!(record.embedded_chunks[0].text, "plain one");
    }
}
