//! Error types for the similarity search read-path (SPEC_FULL.md §9:
//! "Similarity search as linear scan" / native ANN backend).

use thiserror::Error;

/// Result type alias for search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while answering a similarity search query.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] codetriever_embeddings::EmbeddingError),

    #[error("vector store error: {0}")]
    VectorData(#[from] codetriever_vector_data::VectorDataError),

    #[error("query timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("empty query text")]
    EmptyQuery,
}
