//! In-memory fake of [`StatusStore`] for tests, mirroring
//! `codetriever-broker::fake::FakeBroker`'s role as a stand-in for an
//! external backend.

#![allow(clippy::significant_drop_tightening)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{StatusError, StatusResult};
use crate::models::{DocumentStatusRecord, StatsSummary, Status};
use crate::traits::StatusStore;

/// A single-process, in-memory [`StatusStore`] keyed by filepath.
#[derive(Default)]
pub struct MockStatusStore {
    documents: Mutex<HashMap<String, DocumentStatusRecord>>,
}

impl MockStatusStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MockStatusStore {
    async fn add(
        &self,
        filename: &str,
        filepath: &str,
        status: Status,
        trace_id: &str,
    ) -> StatusResult<()> {
        let mut documents = self.documents.lock().expect("mutex poisoned");
        documents.entry(filepath.to_string()).or_insert_with(|| DocumentStatusRecord {
            filename: filename.to_string(),
            filepath: filepath.to_string(),
            status: status.to_string(),
            trace_id: Some(trace_id.to_string()),
            error_message: None,
            created_date: Utc::now(),
            processed_date: None,
        });
        Ok(())
    }

    async fn update(
        &self,
        filepath: &str,
        status: Status,
        error_message: Option<&str>,
    ) -> StatusResult<()> {
        let mut documents = self.documents.lock().expect("mutex poisoned");
        let record = documents
            .get_mut(filepath)
            .ok_or_else(|| StatusError::NotFound(filepath.to_string()))?;
        record.status = status.to_string();
        record.error_message = error_message.map(ToString::to_string);
        if matches!(status, Status::Processed | Status::Error) {
            record.processed_date = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_status(&self, filepath: &str) -> StatusResult<Option<Status>> {
        let documents = self.documents.lock().expect("mutex poisoned");
        documents
            .get(filepath)
            .map(|r| r.status.parse::<Status>().map_err(StatusError::Parse))
            .transpose()
    }

    async fn get(&self, filepath: &str) -> StatusResult<Option<DocumentStatusRecord>> {
        let documents = self.documents.lock().expect("mutex poisoned");
        Ok(documents.get(filepath).cloned())
    }

    async fn list(&self, status: Option<Status>) -> StatusResult<Vec<DocumentStatusRecord>> {
        let documents = self.documents.lock().expect("mutex poisoned");
        let mut records: Vec<_> = documents
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s.to_string()))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_date.cmp(&b.created_date));
        Ok(records)
    }

    async fn stats(&self) -> StatusResult<StatsSummary> {
        let documents = self.documents.lock().expect("mutex poisoned");
        let mut by_status = HashMap::new();
        for record in documents.values() {
            *by_status.entry(record.status.clone()).or_insert(0_i64) += 1;
        }
        let total = documents.len() as i64;
        Ok(StatsSummary { by_status, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_update_then_get_round_trips() {
        let store = MockStatusStore::new();
        store
            .add("a.pdf", "/lib/a.pdf", Status::Queued, "trace-1")
            .await
            .unwrap();
        store
            .update("/lib/a.pdf", Status::Processed, None)
            .await
            .unwrap();
        let record = store.get("/lib/a.pdf").await.unwrap().unwrap();
        assert_eq!(record.status, "processed");
        assert!(record.processed_date.is_some());
    }

    #[tokio::test]
    async fn update_unknown_filepath_is_an_error() {
        let store = MockStatusStore::new();
        let result = store.update("/lib/missing.pdf", Status::Error, None).await;
        assert!(result.is_err());
    }
}
