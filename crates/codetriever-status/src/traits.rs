//! Document status store trait for dependency injection and testing
//! (SPEC_FULL.md §4.6).

use async_trait::async_trait;

use crate::error::StatusResult;
use crate::models::{DocumentStatusRecord, StatsSummary, Status};

/// Status store contract consumed by the extraction manager and every stage
/// worker.
///
/// Uniqueness is enforced on `filepath`: calling [`StatusStore::add`] for a
/// filepath that already has a row is a no-op (mirrors `db_handler.py`'s
/// `INSERT OR IGNORE`), so a duplicate scan never clobbers an in-flight
/// document's trace id or status.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Registers a newly claimed document. Idempotent: does nothing if
    /// `filepath` is already present.
    ///
    /// # Errors
    /// Returns a [`crate::StatusError`] if the write fails.
    async fn add(
        &self,
        filename: &str,
        filepath: &str,
        status: Status,
        trace_id: &str,
    ) -> StatusResult<()>;

    /// Updates the status (and, on failure, the error message) of an
    /// existing document, identified by `filepath`.
    ///
    /// # Errors
    /// Returns a [`crate::StatusError`] if the write fails or no row matches.
    async fn update(
        &self,
        filepath: &str,
        status: Status,
        error_message: Option<&str>,
    ) -> StatusResult<()>;

    /// Looks up the current status of a document by `filepath`.
    ///
    /// # Errors
    /// Returns a [`crate::StatusError`] if the read fails.
    async fn get_status(&self, filepath: &str) -> StatusResult<Option<Status>>;

    /// Fetches the full record for a document by `filepath`.
    ///
    /// # Errors
    /// Returns a [`crate::StatusError`] if the read fails.
    async fn get(&self, filepath: &str) -> StatusResult<Option<DocumentStatusRecord>>;

    /// Lists documents, optionally filtered to a single status.
    ///
    /// # Errors
    /// Returns a [`crate::StatusError`] if the read fails.
    async fn list(&self, status: Option<Status>) -> StatusResult<Vec<DocumentStatusRecord>>;

    /// Returns per-status counts and the overall total.
    ///
    /// # Errors
    /// Returns a [`crate::StatusError`] if the read fails.
    async fn stats(&self) -> StatusResult<StatsSummary>;
}
