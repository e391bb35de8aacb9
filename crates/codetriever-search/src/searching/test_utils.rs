//! Test double for [`SimilaritySearch`].

use super::search::SearchMatch;
use super::service::SimilaritySearch;
use crate::SearchResult;
use async_trait::async_trait;

/// Returns a fixed, caller-supplied set of results regardless of query.
pub struct MockSearch {
    results: Vec<SearchMatch>,
}

impl MockSearch {
    /// Build a mock returning `results` (truncated to the requested limit).
    #[must_use]
    pub fn with_results(results: Vec<SearchMatch>) -> Self {
        Self { results }
    }

    /// Build a mock returning no results.
    #[must_use]
    pub fn empty() -> Self {
        Self { results: Vec::new() }
    }
}

#[async_trait]
impl SimilaritySearch for MockSearch {
    async fn search(
        &self,
        _query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> SearchResult<Vec<SearchMatch>> {
        Ok(self
            .results
            .iter()
            .filter(|r| r.score >= score_threshold)
            .take(limit)
            .cloned()
            .collect())
    }
}
