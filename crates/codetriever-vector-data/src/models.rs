//! Wire schema for the vector store record (SPEC_FULL.md §3: Enriched Chunk,
//! Vector Store Record), mirroring `mongodb_helper.py::store_embeddings`'s
//! document shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Namespace UUID for this store's point ids (randomly generated once), so
/// they don't collide with UUIDs minted by an unrelated system sharing the
/// same collection.
const POINT_ID_NAMESPACE: Uuid = uuid::uuid!("c9a1d9f0-9b3e-4a7e-9e2b-6f2c8d4a7b1f");

/// A single chunk after embedding, carrying the subset of document metadata
/// the original platform calls "important fields" (`embedding.py`'s
/// `important_fields` list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedChunk {
    pub text: String,
    pub chunk_index: usize,
    pub embedding: Vec<f32>,
    pub important_fields: HashMap<String, serde_json::Value>,
}

/// Vector dimensionality and model bookkeeping stored alongside a document's
/// chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorInfo {
    pub count: usize,
    pub dimensions: usize,
    pub model: String,
}

/// Timing and backend bookkeeping for an embed-stage run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub embedding_timestamp: DateTime<Utc>,
    pub embedding_time: f64,
    pub storage_type: String,
}

/// The per-document payload upserted into the vector store, keyed by
/// `document_id`. Mirrors `mongodb_helper.py::store_embeddings`'s document
/// shape, minus the Mongo-specific `_id`/`document_id` upsert filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreRecord {
    pub document_id: String,
    pub metadata: serde_json::Value,
    pub vectors: VectorInfo,
    pub embedded_chunks: Vec<EnrichedChunk>,
    pub processing: ProcessingInfo,
}

impl VectorStoreRecord {
    /// The composite key used for the chunk at `chunk_index` (SPEC_FULL.md
    /// §4.5: `<document_id>_<chunk_index>`). This is the logical identity of
    /// the point and is stored verbatim in its payload; it is not the
    /// Qdrant point id itself, since Qdrant only accepts an unsigned integer
    /// or a UUID there (see [`Self::point_uuid`]).
    #[must_use]
    pub fn point_id(document_id: &str, chunk_index: usize) -> String {
        format!("{document_id}_{chunk_index}")
    }

    /// Deterministic UUID v5 derived from the composite `<document_id>_<chunk_index>`
    /// key, for use as the actual Qdrant point id. Reprocessing the same
    /// document yields the same UUIDs, so upserts replace rather than
    /// duplicate points.
    #[must_use]
    pub fn point_uuid(document_id: &str, chunk_index: usize) -> Uuid {
        Uuid::new_v5(&POINT_ID_NAMESPACE, Self::point_id(document_id, chunk_index).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_uuid_is_deterministic() {
        assert_eq!(
            VectorStoreRecord::point_uuid("doc_0000001", 3),
            VectorStoreRecord::point_uuid("doc_0000001", 3)
        );
    }

    #[test]
    fn point_uuid_differs_by_chunk_index() {
        assert_ne!(
            VectorStoreRecord::point_uuid("doc_0000001", 0),
            VectorStoreRecord::point_uuid("doc_0000001", 1)
        );
    }

    #[test]
    fn point_uuid_differs_by_document_id() {
        assert_ne!(
            VectorStoreRecord::point_uuid("doc_0000001", 0),
            VectorStoreRecord::point_uuid("doc_0000002", 0)
        );
    }
}
