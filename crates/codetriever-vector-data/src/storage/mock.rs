//! In-memory [`VectorStorage`] for testing, storing each document's chunks
//! under its `document_id` so similarity search can be approximated locally
//! without a live Qdrant instance.

#![allow(clippy::significant_drop_tightening)]

use crate::VectorDataResult;
use crate::models::VectorStoreRecord;
use crate::storage::traits::{SearchResult, StorageStats, VectorStorage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock storage backend for testing.
#[derive(Default)]
pub struct MockStorage {
    documents: Mutex<HashMap<String, VectorStoreRecord>>,
    collection_exists: Mutex<bool>,
}

impl MockStorage {
    /// Create a new, empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last-upserted record for `document_id`, for tests that
    /// need to inspect the full payload (e.g. metadata/`trace_id`) rather
    /// than just a search hit.
    #[must_use]
    pub fn get(&self, document_id: &str) -> Option<VectorStoreRecord> {
        self.documents.lock().expect("mutex poisoned").get(document_id).cloned()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

#[async_trait]
impl VectorStorage for MockStorage {
    async fn upsert_document(&self, record: &VectorStoreRecord) -> VectorDataResult<()> {
        self.documents
            .lock()
            .expect("mutex poisoned")
            .insert(record.document_id.clone(), record.clone());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
        score_threshold: f32,
    ) -> VectorDataResult<Vec<SearchResult>> {
        let documents = self.documents.lock().expect("mutex poisoned");
        let mut scored: Vec<SearchResult> = documents
            .values()
            .flat_map(|record| {
                record.embedded_chunks.iter().map(move |chunk| {
                    let score = Self::cosine_similarity(&query_embedding, &chunk.embedding);
                    SearchResult {
                        text: chunk.text.clone(),
                        document_id: record.document_id.clone(),
                        chunk_index: chunk.chunk_index,
                        metadata: serde_json::to_value(&chunk.important_fields)
                            .unwrap_or(serde_json::Value::Null),
                        score,
                    }
                })
            })
            .filter(|r| r.score >= score_threshold)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_document(&self, document_id: &str) -> VectorDataResult<()> {
        self.documents.lock().expect("mutex poisoned").remove(document_id);
        Ok(())
    }

    async fn collection_exists(&self) -> VectorDataResult<bool> {
        Ok(*self.collection_exists.lock().expect("mutex poisoned"))
    }

    async fn ensure_collection(&self, _dimensions: usize) -> VectorDataResult<()> {
        *self.collection_exists.lock().expect("mutex poisoned") = true;
        Ok(())
    }

    async fn drop_collection(&self) -> VectorDataResult<bool> {
        let mut exists = self.collection_exists.lock().expect("mutex poisoned");
        let existed = *exists;
        *exists = false;
        self.documents.lock().expect("mutex poisoned").clear();
        Ok(existed)
    }

    async fn get_stats(&self) -> VectorDataResult<StorageStats> {
        let documents = self.documents.lock().expect("mutex poisoned");
        let vector_count = documents.values().map(|r| r.embedded_chunks.len()).sum();
        Ok(StorageStats {
            vector_count,
            storage_bytes: None,
            collection_name: "mock".to_string(),
            storage_type: "mock".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichedChunk, ProcessingInfo, VectorInfo};
    use chrono::Utc;

    fn sample_record(document_id: &str, embedding: Vec<f32>) -> VectorStoreRecord {
        VectorStoreRecord {
            document_id: document_id.to_string(),
            metadata: serde_json::json!({}),
            vectors: VectorInfo {
                count: 1,
                dimensions: embedding.len(),
                model: "test-model".to_string(),
            },
            embedded_chunks: vec![EnrichedChunk {
                text: "hello world".to_string(),
                chunk_index: 0,
                embedding,
                important_fields: std::collections::HashMap::new(),
            }],
            processing: ProcessingInfo {
                embedding_timestamp: Utc::now(),
                embedding_time: 0.01,
                storage_type: "mock".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn upsert_then_search_finds_exact_match() {
        let storage = MockStorage::new();
        storage
            .upsert_document(&sample_record("doc_1", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = storage.search(vec![1.0, 0.0], 5, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "doc_1");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_respects_score_threshold() {
        let storage = MockStorage::new();
        storage
            .upsert_document(&sample_record("doc_1", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = storage.search(vec![0.0, 1.0], 5, 0.5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_document_removes_its_chunks() {
        let storage = MockStorage::new();
        storage
            .upsert_document(&sample_record("doc_1", vec![1.0, 0.0]))
            .await
            .unwrap();
        storage.delete_document("doc_1").await.unwrap();

        let results = storage.search(vec![1.0, 0.0], 5, 0.0).await.unwrap();
        assert!(results.is_empty());
    }
}
