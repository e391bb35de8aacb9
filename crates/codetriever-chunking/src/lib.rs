//! Token-bounded, structure-aware document chunking (SPEC_FULL.md §4.4).
//!
//! Consumes a `codetriever-extraction::StructuredDocument` and produces an
//! ordered sequence of chunks that respect a token budget while preserving
//! structural provenance, plus the atomic staging-file writer the chunk
//! worker hands off to the embed stage.

pub mod chunk;
pub mod error;
pub mod hf_counter;
pub mod hybrid;
pub mod staging;
pub mod tiktoken_counter;
pub mod traits;

pub use chunk::ChunkRecord;
pub use error::{ChunkingError, ChunkingResult};
pub use hf_counter::HfTokenCounter;
pub use hybrid::{HybridChunker, HybridChunkerConfig};
pub use staging::{staging_path, write_staging_atomic};
pub use tiktoken_counter::TiktokenCounter;
pub use traits::TokenCounter;
