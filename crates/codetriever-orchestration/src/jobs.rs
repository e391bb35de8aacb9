//! Wire payloads carried across the three job queues (SPEC_FULL.md §3).

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Who/why a job was dispatched — carried on the extract job for debugging
/// (mirrors `extraction_manager.py`'s `{"source": ..., "manager_id": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataHint {
    pub source: String,
    pub manager_id: String,
}

/// Enqueued by the extraction manager onto `EXTRACT_JOBS` (SPEC_FULL.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractJob {
    pub trace_id: String,
    pub file_path: String,
    pub filename: String,
    pub job_timestamp: f64,
    pub metadata_hint: MetadataHint,
}

/// Enqueued by an extract worker onto `CHUNK_JOBS` (SPEC_FULL.md §3).
///
/// `document_serialized` is the extract stage's structured-document output;
/// `markdown_fallback` is retained only for backward compatibility and used
/// only when `document_serialized` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkJob {
    pub trace_id: String,
    pub file_path: String,
    pub filename: String,
    pub document_serialized: Option<serde_json::Value>,
    pub markdown_fallback: String,
    pub metadata: serde_json::Value,
    pub extraction_timestamp: f64,
    pub producer_worker_id: String,
}

/// Enqueued by a chunk worker onto `EMBED_JOBS` (SPEC_FULL.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedJob {
    pub chunks_file_reference: String,
    pub metadata: serde_json::Value,
}

/// Derives a stable `doc_<hash mod 10^7, zero-padded>` id from a file path
/// (SPEC_FULL.md §3: Enriched Chunk's `document_id`), used whenever the
/// metadata doesn't already carry one.
#[must_use]
pub fn derive_document_id(file_path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    file_path.hash(&mut hasher);
    let bucket = hasher.finish() % 10_000_000;
    format!("doc_{bucket:07}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_stable_for_same_path() {
        assert_eq!(derive_document_id("/lib/report.pdf"), derive_document_id("/lib/report.pdf"));
    }

    #[test]
    fn document_id_follows_doc_prefix_and_width() {
        let id = derive_document_id("/lib/report.pdf");
        assert!(id.starts_with("doc_"));
        assert_eq!(id.len(), "doc_".len() + 7);
    }
}
