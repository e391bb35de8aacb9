//! Domain models for the document status store (SPEC_FULL.md §3: Document
//! Status Record).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a document as it moves through extract, chunk, and
/// embed.
///
/// Transitions are monotonic except `Error` -> `Queued`, which only happens
/// by operator action (re-queueing a failed document), never automatically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Queued,
    Processing,
    Processed,
    Error,
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "error" => Ok(Self::Error),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One row of the status store, keyed uniquely by `filepath`.
///
/// `trace_id` is set once, at scan-claim time, and never changes again for
/// this filepath's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentStatusRecord {
    pub filename: String,
    pub filepath: String,
    pub status: String,
    pub trace_id: Option<String>,
    pub error_message: Option<String>,
    pub created_date: DateTime<Utc>,
    pub processed_date: Option<DateTime<Utc>>,
}

impl DocumentStatusRecord {
    /// Parses the stored `status` column into a [`Status`].
    ///
    /// # Errors
    /// Returns an error string if the stored value isn't a recognized status.
    pub fn parsed_status(&self) -> Result<Status, String> {
        self.status.parse()
    }
}

/// Counts of documents per status, plus the overall total.
///
/// Mirrors `db_handler.py`'s `get_stats` (`GROUP BY status`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    pub by_status: HashMap<String, i64>,
    pub total: i64,
}
