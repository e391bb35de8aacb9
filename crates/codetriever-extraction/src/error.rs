//! Error type for the document conversion step (SPEC_FULL.md §4.3.1).

use thiserror::Error;

/// Result type alias for extraction operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Errors a [`crate::DocumentConverter`] can return.
///
/// The extract worker maps any of these to status `error` with the message
/// recorded verbatim (SPEC_FULL.md §4.3, §7).
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} contains no extractable text")]
    EmptyDocument { path: String },

    #[error("failed to parse {path}: {reason}")]
    ParseFailure { path: String, reason: String },
}
