//! The versioned structured-document schema handed across the extract to
//! chunk stage boundary (SPEC_FULL.md §3.2).
//!
//! Pinning both the extract worker (writer) and the chunk worker (reader) to
//! this schema is what lets the chunk stage deserialize losslessly without
//! re-invoking the converter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current schema version. Bump when [`DocumentBlock`]'s shape changes in a
/// way that isn't backward compatible for a chunk worker running an older
/// binary.
pub const SCHEMA_VERSION: u32 = 1;

/// One contiguous span of extracted text plus its structural location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentBlock {
    pub text: String,
    /// Heading path above this block, outermost first. Empty when the
    /// source format carries no structure (e.g. a plain PDF page).
    pub section_path: Vec<String>,
    pub page: Option<u32>,
}

/// The converter's output: an ordered block list plus document metadata,
/// versioned so the chunk stage can detect a schema it no longer supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub schema_version: u32,
    pub blocks: Vec<DocumentBlock>,
    pub doc_metadata: HashMap<String, serde_json::Value>,
}

impl StructuredDocument {
    /// Builds a document at the current schema version.
    #[must_use]
    pub fn new(blocks: Vec<DocumentBlock>, doc_metadata: HashMap<String, serde_json::Value>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            blocks,
            doc_metadata,
        }
    }

    /// Concatenates every block's text in order, separated by blank lines.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
