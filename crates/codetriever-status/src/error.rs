//! Error types for the document status store

use codetriever_common::define_error_enum;

define_error_enum! {
    pub enum StatusError {
        #[error("query error: {0}")]
        Query(String),

        #[error("document not found: {0}")]
        NotFound(String),
    }
}

impl From<sqlx::Error> for StatusError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("no matching row".to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StatusError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Configuration(e.to_string())
    }
}

/// Result alias used throughout this crate (`Result<T>` from the macro is
/// re-exported under this name to avoid clashing with `std::result::Result`
/// at call sites that `use codetriever_status::*`).
pub type StatusResult<T> = Result<T>;

