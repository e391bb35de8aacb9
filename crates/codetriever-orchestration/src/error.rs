//! Error types unifying the five backend contracts the pipeline drives.

use thiserror::Error;

/// Result type alias used throughout this crate.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// Errors surfaced while running the scan-claim-dispatch manager or any of
/// the three pipeline stages.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("queue broker error: {0}")]
    Broker(#[from] codetriever_broker::BrokerError),

    #[error("status store error: {0}")]
    Status(#[from] codetriever_status::StatusError),

    #[error("document extraction error: {0}")]
    Extraction(#[from] codetriever_extraction::ExtractError),

    #[error("chunking error: {0}")]
    Chunking(#[from] codetriever_chunking::ChunkingError),

    #[error("embedding error: {0}")]
    Embedding(#[from] codetriever_embeddings::EmbeddingError),

    #[error("vector storage error: {0}")]
    VectorStorage(#[from] codetriever_vector_data::VectorDataError),

    #[error("job payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A queue payload decoded but was missing a field required for this
    /// stage (e.g. neither `document_serialized` nor `markdown_fallback`
    /// could be converted back into a structured document).
    #[error("malformed job: {0}")]
    MalformedJob(String),
}
