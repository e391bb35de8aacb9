//! SQLite connection pool management for the status store.

use codetriever_config::StatusStoreConfig;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::{StatusError, StatusResult};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    filepath TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    trace_id TEXT,
    error_message TEXT,
    created_date TEXT NOT NULL,
    processed_date TEXT
);
CREATE INDEX IF NOT EXISTS idx_documents_status ON documents (status);
";

/// Opens (creating the file if absent) the SQLite database at
/// `config.db_path`, matching `db_handler.py`'s `DocumentDBHandler.__init__`.
///
/// # Errors
/// Returns a [`StatusError`] if the database file cannot be opened.
pub async fn create_pool(config: &StatusStoreConfig) -> StatusResult<SqlitePool> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StatusError::Io(e.to_string()))?;
        }
    }
    let options = SqliteConnectOptions::new()
        .filename(&config.db_path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Opens the pool and ensures the `documents` table exists.
///
/// # Errors
/// Returns a [`StatusError`] if the pool cannot be created or the schema
/// cannot be applied.
pub async fn initialize_database(config: &StatusStoreConfig) -> StatusResult<SqlitePool> {
    let pool = create_pool(config).await?;
    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    Ok(pool)
}
