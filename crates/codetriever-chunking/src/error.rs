//! Error type for the chunk stage (SPEC_FULL.md §4.4).

use thiserror::Error;

/// Result type alias for chunking operations.
pub type ChunkingResult<T> = std::result::Result<T, ChunkingError>;

/// Errors the chunk worker can encounter.
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("failed to build token counter for model {model}: {reason}")]
    TokenCounter { model: String, reason: String },

    #[error("failed to write staging artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize staging artifact: {0}")]
    Serialization(#[from] serde_json::Error),
}
