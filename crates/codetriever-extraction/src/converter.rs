//! The `DocumentConverter` contract (SPEC_FULL.md §4.3.1): the trait
//! boundary that lets PDF ship in the base implementation while later
//! formats plug in without touching the extract worker.

use crate::document::StructuredDocument;
use crate::error::ExtractResult;
use std::path::Path;

/// A converter's output: the structured block list plus a pre-rendered
/// markdown fallback, used when `document_serialized` is unavailable to a
/// downstream reader (SPEC_FULL.md §3: Chunk Job's `markdown_fallback`).
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub document: StructuredDocument,
    pub markdown: String,
}

/// Converts a source file on disk into a [`ConvertedDocument`].
///
/// Implementations extract whatever document-info fields the source format
/// exposes (title, author, subject, ...) into `document.doc_metadata`; the
/// extract worker layers filesystem attributes and the title fallback on
/// top (SPEC_FULL.md §3.1).
pub trait DocumentConverter: Send + Sync {
    /// Converts `path` into a [`ConvertedDocument`].
    ///
    /// # Errors
    /// Returns [`crate::ExtractError`] if the file can't be read or yields
    /// no extractable text.
    fn convert(&self, path: &Path) -> ExtractResult<ConvertedDocument>;
}
