//! Orchestration core: the scan-claim-dispatch manager and the three
//! pipeline stages (SPEC_FULL.md §4.2–§4.5) that turn a file dropped into
//! the watched library into a searchable, embedded document.
//!
//! This crate holds pure processing logic against injected trait objects
//! (`QueueBroker`, `StatusStore`, `DocumentConverter`, `EmbeddingService`,
//! `VectorStorage`) so it can be exercised with fakes; `codetriever-workers`
//! wires it to the concrete Redis/SQLite/Qdrant backends.

pub mod error;
pub mod jobs;
pub mod manager;
pub mod stages;
pub mod worker_loop;

pub use error::{OrchestrationError, OrchestrationResult};
pub use jobs::{ChunkJob, EmbedJob, ExtractJob, MetadataHint, derive_document_id};
pub use manager::{ExtractionManager, ScanSummary};
pub use stages::{ChunkStage, EmbedStage, ExtractStage};
