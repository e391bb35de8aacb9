//! The three pipeline stages (SPEC_FULL.md §4.3, §4.4, §4.5): extract,
//! chunk, embed. Each is a standalone processor a worker binary drives off
//! its own queue.

pub mod chunk;
pub mod embed;
pub mod extract;

pub use chunk::ChunkStage;
pub use embed::EmbedStage;
pub use extract::ExtractStage;
