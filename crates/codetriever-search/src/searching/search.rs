//! Default `SimilaritySearch` implementation: embed the query, delegate the
//! nearest-neighbor lookup to [`codetriever_vector_data::VectorStorage`],
//! and cache recent query results (SPEC_FULL.md §9: "Similarity search as
//! linear scan" — the linear scan itself lives in the vector store
//! backend, not here).

use super::service::SimilaritySearch;
use crate::{SearchError, SearchResult};
use async_trait::async_trait;
use codetriever_embeddings::EmbeddingService;
use codetriever_vector_data::VectorStorage;
use std::sync::{Arc, Mutex};

/// One scored hit: chunk text, its source document/index, and metadata.
pub type SearchMatch = codetriever_vector_data::SearchResult;

type ResultCache = Mutex<lru::LruCache<String, Vec<SearchMatch>>>;

/// Embeds the query text through the configured embedding model, then asks
/// the vector store for the nearest chunks at or above `score_threshold`.
pub struct Search {
    embedding_service: Arc<dyn EmbeddingService>,
    vector_storage: Arc<dyn VectorStorage>,
    cache: ResultCache,
}

impl Search {
    /// Builds a search service over the given embedding and vector-storage
    /// backends. Caches up to 100 distinct `(query, limit, threshold)` keys.
    #[must_use]
    pub fn new(
        embedding_service: Arc<dyn EmbeddingService>,
        vector_storage: Arc<dyn VectorStorage>,
    ) -> Self {
        Self {
            embedding_service,
            vector_storage,
            cache: Mutex::new(lru::LruCache::new(std::num::NonZeroUsize::new(100).expect("100 != 0"))),
        }
    }
}

#[async_trait]
impl SimilaritySearch for Search {
    #[tracing::instrument(skip(self), fields(query, limit, score_threshold))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> SearchResult<Vec<SearchMatch>> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let cache_key = format!("{query}:{limit}:{score_threshold}");
        if let Ok(mut cache) = self.cache.lock()
            && let Some(hit) = cache.get(&cache_key)
        {
            tracing::debug!("search cache hit");
            return Ok(hit.clone());
        }

        let mut embeddings = self.embedding_service.generate_embeddings(vec![query]).await?;
        let query_embedding = embeddings.pop().ok_or(SearchError::EmptyQuery)?;

        let results = self
            .vector_storage
            .search(query_embedding, limit, score_threshold)
            .await?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(cache_key, results.clone());
        }

        tracing::info!(result_count = results.len(), "similarity search completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetriever_embeddings::{EmbeddingError, EmbeddingProvider, EmbeddingStats};
    use codetriever_vector_data::{EnrichedChunk, MockStorage, ProcessingInfo, VectorInfo, VectorStoreRecord};

    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn embedding_dimension(&self) -> usize {
            2
        }
        fn max_tokens(&self) -> usize {
            8191
        }
        fn model_name(&self) -> &str {
            "stub"
        }
        async fn is_ready(&self) -> bool {
            true
        }
        async fn ensure_ready(&self) -> Result<(), EmbeddingError> {
            Ok(())
        }
        async fn get_tokenizer(&self) -> Option<std::sync::Arc<tokenizers::Tokenizer>> {
            None
        }
    }

    struct StubService(StubProvider);

    #[async_trait]
    impl EmbeddingService for StubService {
        async fn generate_embeddings(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.0.embed_batch(&texts).await
        }
        fn provider(&self) -> &dyn EmbeddingProvider {
            &self.0
        }
        async fn get_stats(&self) -> EmbeddingStats {
            EmbeddingStats::default()
        }
    }

    async fn seeded_storage() -> Arc<MockStorage> {
        let storage = Arc::new(MockStorage::new());
        storage
            .upsert_document(&VectorStoreRecord {
                document_id: "doc_1".to_string(),
                metadata: serde_json::json!({"title": "sample"}),
                vectors: VectorInfo {
                    count: 1,
                    dimensions: 2,
                    model: "stub".to_string(),
                },
                embedded_chunks: vec![EnrichedChunk {
                    text: "hello world".to_string(),
                    chunk_index: 0,
                    embedding: vec![1.0, 0.0],
                    important_fields: std::collections::HashMap::new(),
                }],
                processing: ProcessingInfo {
                    embedding_timestamp: chrono::Utc::now(),
                    embedding_time: 0.01,
                    storage_type: "mock".to_string(),
                },
            })
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn search_returns_matches_above_threshold() {
        let search = Search::new(Arc::new(StubService(StubProvider)), seeded_storage().await);
        let results = search.search("sample query", 5, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "doc_1");
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let search = Search::new(Arc::new(StubService(StubProvider)), seeded_storage().await);
        let err = search.search("   ", 5, 0.5).await.unwrap_err();
        assert!(matches!(err, SearchError::EmptyQuery));
    }
}
