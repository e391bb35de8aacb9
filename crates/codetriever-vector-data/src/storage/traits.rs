//! Storage abstraction trait for the vector database backend
//! (SPEC_FULL.md §4.5, §6: vector collection schema).

use crate::VectorDataResult;
use crate::models::VectorStoreRecord;
use async_trait::async_trait;

/// One search hit: the chunk text plus its similarity score and metadata.
///
/// Mirrors `mongodb_helper.py::search_similar`'s returned
/// `{text, metadata, score}` shape.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub text: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub metadata: serde_json::Value,
    pub score: f32,
}

/// Statistics about the vector storage.
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub vector_count: usize,
    pub storage_bytes: Option<u64>,
    pub collection_name: String,
    pub storage_type: String,
}

/// Trait for vector storage backends.
///
/// Abstracts vector database operations so the embed worker and the
/// similarity search path can be tested without a live Qdrant instance.
#[async_trait]
pub trait VectorStorage: Send + Sync {
    /// Upserts every chunk in `record` as a separate point keyed
    /// `<document_id>_<chunk_index>` (SPEC_FULL.md §4.5). Re-running with the
    /// same `document_id` replaces the prior points for unchanged indices.
    ///
    /// # Errors
    /// Returns a [`crate::VectorDataError`] if the upsert fails.
    async fn upsert_document(&self, record: &VectorStoreRecord) -> VectorDataResult<()>;

    /// Searches for the `limit` chunks nearest `query_embedding`, filtered to
    /// scores at or above `score_threshold`.
    ///
    /// # Errors
    /// Returns a [`crate::VectorDataError`] if the search fails.
    async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
        score_threshold: f32,
    ) -> VectorDataResult<Vec<SearchResult>>;

    /// Deletes every point belonging to `document_id`.
    ///
    /// # Errors
    /// Returns a [`crate::VectorDataError`] if the delete fails.
    async fn delete_document(&self, document_id: &str) -> VectorDataResult<()>;

    /// Checks whether the backing collection exists.
    ///
    /// # Errors
    /// Returns a [`crate::VectorDataError`] if the check fails.
    async fn collection_exists(&self) -> VectorDataResult<bool>;

    /// Creates the backing collection (sized for `dimensions`) if absent.
    ///
    /// # Errors
    /// Returns a [`crate::VectorDataError`] if creation fails.
    async fn ensure_collection(&self, dimensions: usize) -> VectorDataResult<()>;

    /// Drops the entire collection. Returns `true` if it existed.
    ///
    /// # Errors
    /// Returns a [`crate::VectorDataError`] if the drop fails.
    async fn drop_collection(&self) -> VectorDataResult<bool>;

    /// Returns storage statistics for the collection.
    ///
    /// # Errors
    /// Returns a [`crate::VectorDataError`] if the stats query fails.
    async fn get_stats(&self) -> VectorDataResult<StorageStats>;
}
