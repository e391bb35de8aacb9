//! SQLite-backed [`StatusStore`], matching the original platform's
//! `db_handler.py::DocumentDBHandler`: a single `documents` table keyed
//! uniquely on `filepath`, with `INSERT OR IGNORE` claim semantics and a
//! `GROUP BY status` stats query.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::error::{StatusError, StatusResult};
use crate::models::{DocumentStatusRecord, StatsSummary, Status};
use crate::traits::StatusStore;

/// Repository for the `documents` status table.
pub struct SqliteStatusStore {
    pool: SqlitePool,
}

impl SqliteStatusStore {
    /// Wrap an already-initialized pool (see [`crate::pool::initialize_database`]).
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    async fn add(
        &self,
        filename: &str,
        filepath: &str,
        status: Status,
        trace_id: &str,
    ) -> StatusResult<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT OR IGNORE INTO documents \
             (filename, filepath, status, trace_id, created_date) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(filename)
        .bind(filepath)
        .bind(status.to_string())
        .bind(trace_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        filepath: &str,
        status: Status,
        error_message: Option<&str>,
    ) -> StatusResult<()> {
        let processed_date = matches!(status, Status::Processed | Status::Error).then(Utc::now);
        let result = sqlx::query(
            "UPDATE documents \
             SET status = ?, error_message = ?, processed_date = COALESCE(?, processed_date) \
             WHERE filepath = ?",
        )
        .bind(status.to_string())
        .bind(error_message)
        .bind(processed_date)
        .bind(filepath)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StatusError::NotFound(filepath.to_string()));
        }
        Ok(())
    }

    async fn get_status(&self, filepath: &str) -> StatusResult<Option<Status>> {
        let row = sqlx::query("SELECT status FROM documents WHERE filepath = ?")
            .bind(filepath)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            let raw: String = r.try_get("status")?;
            raw.parse::<Status>()
                .map_err(StatusError::Parse)
        })
        .transpose()
    }

    async fn get(&self, filepath: &str) -> StatusResult<Option<DocumentStatusRecord>> {
        let record = sqlx::query_as::<_, DocumentStatusRecord>(
            "SELECT filename, filepath, status, trace_id, error_message, created_date, processed_date \
             FROM documents WHERE filepath = ?",
        )
        .bind(filepath)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list(&self, status: Option<Status>) -> StatusResult<Vec<DocumentStatusRecord>> {
        let records = if let Some(status) = status {
            sqlx::query_as::<_, DocumentStatusRecord>(
                "SELECT filename, filepath, status, trace_id, error_message, created_date, processed_date \
                 FROM documents WHERE status = ? ORDER BY created_date",
            )
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, DocumentStatusRecord>(
                "SELECT filename, filepath, status, trace_id, error_message, created_date, processed_date \
                 FROM documents ORDER BY created_date",
            )
            .fetch_all(&self.pool)
            .await?
        };
        Ok(records)
    }

    async fn stats(&self) -> StatusResult<StatsSummary> {
        let rows = sqlx::query("SELECT status, COUNT(*) as count FROM documents GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut by_status = HashMap::new();
        let mut total = 0_i64;
        for row in rows {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            total += count;
            by_status.insert(status, count);
        }
        Ok(StatsSummary { by_status, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetriever_config::StatusStoreConfig;

    async fn test_store() -> (tempfile::TempDir, SqliteStatusStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StatusStoreConfig {
            db_path: dir.path().join("documents.db"),
        };
        let pool = crate::pool::initialize_database(&config)
            .await
            .expect("init db");
        (dir, SqliteStatusStore::new(pool))
    }

    #[tokio::test]
    async fn add_is_idempotent_on_filepath() {
        let (_dir, store) = test_store().await;
        store
            .add("a.pdf", "/lib/a.pdf", Status::Queued, "trace-1")
            .await
            .unwrap();
        store
            .add("a.pdf", "/lib/a.pdf", Status::Queued, "trace-2")
            .await
            .unwrap();

        let record = store.get("/lib/a.pdf").await.unwrap().unwrap();
        assert_eq!(record.trace_id.as_deref(), Some("trace-1"));
    }

    #[tokio::test]
    async fn update_sets_processed_date_only_on_terminal_status() {
        let (_dir, store) = test_store().await;
        store
            .add("a.pdf", "/lib/a.pdf", Status::Queued, "trace-1")
            .await
            .unwrap();
        store
            .update("/lib/a.pdf", Status::Processing, None)
            .await
            .unwrap();
        let record = store.get("/lib/a.pdf").await.unwrap().unwrap();
        assert!(record.processed_date.is_none());

        store
            .update("/lib/a.pdf", Status::Processed, None)
            .await
            .unwrap();
        let record = store.get("/lib/a.pdf").await.unwrap().unwrap();
        assert!(record.processed_date.is_some());
    }

    #[tokio::test]
    async fn update_missing_filepath_errors() {
        let (_dir, store) = test_store().await;
        let result = store.update("/lib/missing.pdf", Status::Error, Some("x")).await;
        assert!(matches!(result, Err(StatusError::NotFound(_))));
    }

    #[tokio::test]
    async fn stats_groups_by_status() {
        let (_dir, store) = test_store().await;
        store
            .add("a.pdf", "/lib/a.pdf", Status::Queued, "t1")
            .await
            .unwrap();
        store
            .add("b.pdf", "/lib/b.pdf", Status::Queued, "t2")
            .await
            .unwrap();
        store
            .update("/lib/b.pdf", Status::Processed, None)
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status.get("queued"), Some(&1));
        assert_eq!(stats.by_status.get("processed"), Some(&1));
    }
}
