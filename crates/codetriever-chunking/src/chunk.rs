//! The chunk record produced by the hybrid chunker (SPEC_FULL.md §3: Chunk
//! Set).

use serde::{Deserialize, Serialize};

/// One chunk of a document: its text and the structural path above it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    pub text: String,
    pub section_path: Vec<String>,
}
