//! Document-to-structured-document conversion (SPEC_FULL.md §4.3.1, §3.2).
//!
//! The extract stage's sole external collaborator: a `DocumentConverter`
//! trait with a PDF-backed base implementation, plus the versioned
//! structured-document schema handed to the chunk stage and the metadata
//! assembly rules resolved from the original platform's extraction script.

pub mod converter;
pub mod document;
pub mod error;
pub mod metadata;
pub mod pdf;

pub use converter::{ConvertedDocument, DocumentConverter};
pub use document::{DocumentBlock, SCHEMA_VERSION, StructuredDocument};
pub use error::{ExtractError, ExtractResult};
pub use metadata::build_metadata;
pub use pdf::PdfConverter;
