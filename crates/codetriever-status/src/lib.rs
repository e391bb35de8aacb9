//! Document status store: a single `documents` table tracking each file's
//! lifecycle (`queued` -> `processing` -> `processed`/`error`), keyed
//! uniquely on filepath (SPEC_FULL.md §3, §4.6).

pub mod error;
pub mod mock;
pub mod models;
pub mod pool;
pub mod repository;
pub mod traits;

pub use error::{StatusError, StatusResult};
pub use mock::MockStatusStore;
pub use models::{DocumentStatusRecord, StatsSummary, Status};
pub use pool::{create_pool, initialize_database};
pub use repository::SqliteStatusStore;
pub use traits::StatusStore;
