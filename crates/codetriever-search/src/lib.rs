//! Similarity search read-path (SPEC_FULL.md §1, §4, §9).
//!
//! Embeds a query through the configured embedding model and asks the
//! vector store for its nearest neighbors. Not part of the ingestion
//! fabric's core — a thin consumer of `codetriever-vector-data`'s search
//! contract for the interactive search UI (out of scope, named only as a
//! consumer of this crate).

pub mod error;
pub mod searching;

pub use error::{SearchError, SearchResult};
pub use searching::{Search, SearchMatch, SimilaritySearch};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks {
    pub use crate::searching::test_utils::MockSearch;
}
