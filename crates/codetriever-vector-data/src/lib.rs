//! Codetriever vector data storage crate
//!
//! This crate provides vector database operations for storing and retrieving
//! document chunk embeddings (SPEC_FULL.md §3, §4.5, §6). It supports Qdrant
//! as its production backend and includes an in-memory mock for testing.

pub mod error;
pub mod models;
pub mod storage;

// Re-export main types
pub use error::{VectorDataError, VectorDataResult};
pub use models::{EnrichedChunk, ProcessingInfo, VectorInfo, VectorStoreRecord};
pub use storage::{MockStorage, QdrantStorage, SearchResult, StorageStats, VectorStorage};
// Use unified configuration from codetriever-config
pub use codetriever_config::VectorStorageConfig;
