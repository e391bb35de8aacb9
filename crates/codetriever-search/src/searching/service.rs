//! `SimilaritySearch` trait: the contract the interactive search UI (an
//! external collaborator per SPEC_FULL.md §1) consumes.

use crate::SearchResult;
use crate::searching::search::SearchMatch;
use async_trait::async_trait;

/// Read-path search contract: embed `query`, return the `limit` nearest
/// chunks at or above `score_threshold`, ranked by descending score.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Runs a similarity search for `query` (SPEC_FULL.md §4, S5).
    ///
    /// # Errors
    /// Returns a [`crate::SearchError`] if query embedding or the vector
    /// store lookup fails.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> SearchResult<Vec<SearchMatch>>;
}
