//! Base `DocumentConverter`: PDF text extraction (SPEC_FULL.md §4.3.1).
//!
//! `pdf-extract` exposes page-segmented text but not the document info
//! dictionary (title/author/...), so `doc_metadata` from this converter is
//! empty — the extract worker's filesystem-derived metadata (SPEC_FULL.md
//! §3.1) is what actually populates a document's title/author fields today.

use crate::converter::{ConvertedDocument, DocumentConverter};
use crate::document::{DocumentBlock, StructuredDocument};
use crate::error::{ExtractError, ExtractResult};
use std::collections::HashMap;
use std::path::Path;

/// Converts PDF files using `pdf-extract`'s pure-Rust text layout engine.
#[derive(Debug, Default)]
pub struct PdfConverter;

impl PdfConverter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentConverter for PdfConverter {
    fn convert(&self, path: &Path) -> ExtractResult<ConvertedDocument> {
        let path_str = path.display().to_string();

        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path_str.clone(),
            source,
        })?;

        if bytes.is_empty() {
            return Err(ExtractError::EmptyDocument { path: path_str });
        }

        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| ExtractError::ParseFailure {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let blocks: Vec<DocumentBlock> = pages
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| DocumentBlock {
                text,
                section_path: Vec::new(),
                page: u32::try_from(i + 1).ok(),
            })
            .collect();

        if blocks.is_empty() {
            return Err(ExtractError::EmptyDocument { path: path_str });
        }

        let document = StructuredDocument::new(blocks, HashMap::new());
        let markdown = document.plain_text();

        Ok(ConvertedDocument { document, markdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").expect("write");

        let converter = PdfConverter::new();
        let err = converter.convert(&path).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument { .. }));
    }

    #[test]
    fn garbage_file_fails_to_parse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.pdf");
        std::fs::write(&path, b"not a pdf at all").expect("write");

        let converter = PdfConverter::new();
        let err = converter.convert(&path).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::ParseFailure { .. } | ExtractError::EmptyDocument { .. }
        ));
    }
}
