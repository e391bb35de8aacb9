//! Codetriever embedding generation crate
//!
//! This crate provides ML-based embedding generation for the embed stage of
//! the ingestion fabric. It handles the conversion of document chunk text
//! into high-dimensional vectors using local transformer models.

pub mod embedding;
pub mod error;

// Re-export main types
pub use codetriever_config::EmbeddingConfig;
pub use embedding::{
    DefaultEmbeddingService, EmbeddingModel, EmbeddingProvider, EmbeddingService, EmbeddingStats,
};
pub use error::{EmbeddingError, EmbeddingResult};
