//! Qdrant-backed [`VectorStorage`]: upserts one point per chunk, carrying
//! the chunk text, its important fields, and the full document metadata
//! (including `trace_id`, for the trace-continuity invariant in SPEC_FULL.md
//! §8) in the payload so search results are complete without a follow-up
//! lookup. Replaces the original platform's `search_similar`'s in-process
//! cosine scan with Qdrant's native ANN search (SPEC_FULL.md §9).
//!
//! Qdrant only accepts an unsigned integer or a UUID as a point id, so the
//! logical `<document_id>_<chunk_index>` composite key (SPEC_FULL.md §4.5)
//! is never used as the point id directly — it is instead hashed into a
//! deterministic UUID v5 (see [`VectorStoreRecord::point_uuid`]) and kept
//! verbatim in the payload under `chunk_key` so the composite identity is
//! still recoverable from a search hit.

use crate::models::VectorStoreRecord;
use crate::{
    VectorDataError, VectorDataResult,
    storage::traits::{SearchResult, StorageStats, VectorStorage},
};
use anyhow::Context;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CollectionExistsRequest, CreateCollection, DeleteCollection, DeletePoints, Distance,
    Filter, PointStruct, PointsSelector, SearchPoints, UpsertPoints, Value, VectorParams,
    points_selector::PointsSelectorOneOf,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;

/// Vector database client for storing and searching document chunk
/// embeddings using Qdrant.
#[derive(Clone)]
pub struct QdrantStorage {
    client: Qdrant,
    collection_name: String,
}

impl QdrantStorage {
    /// Connects to `url` and returns a client for `collection_name`. Does
    /// not create the collection — call [`VectorStorage::ensure_collection`]
    /// once the embedding dimension is known.
    ///
    /// # Errors
    /// Returns a [`VectorDataError`] if the client cannot be constructed.
    pub fn new(url: &str, collection_name: String) -> VectorDataResult<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Ok(api_key) = std::env::var("QDRANT_API_KEY") {
            builder = builder.api_key(api_key);
        }
        let client = builder
            .build()
            .map_err(|e| VectorDataError::Storage(format!("failed to create Qdrant client: {e}")))?;
        Ok(Self {
            client,
            collection_name,
        })
    }
}

#[async_trait]
impl VectorStorage for QdrantStorage {
    async fn collection_exists(&self) -> VectorDataResult<bool> {
        let request = CollectionExistsRequest {
            collection_name: self.collection_name.clone(),
        };
        self.client
            .collection_exists(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("failed to check collection: {e}")))
    }

    async fn ensure_collection(&self, dimensions: usize) -> VectorDataResult<()> {
        if self.collection_exists().await? {
            return Ok(());
        }

        let request = CreateCollection {
            collection_name: self.collection_name.clone(),
            vectors_config: Some(
                VectorParams {
                    size: dimensions as u64,
                    distance: Distance::Cosine as i32,
                    ..Default::default()
                }
                .into(),
            ),
            ..Default::default()
        };

        match self.client.create_collection(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => Err(VectorDataError::Storage(format!(
                "failed to create collection '{}': {e}",
                self.collection_name
            ))),
        }
    }

    async fn drop_collection(&self) -> VectorDataResult<bool> {
        if !self.collection_exists().await? {
            return Ok(false);
        }
        let request = DeleteCollection {
            collection_name: self.collection_name.clone(),
            ..Default::default()
        };
        self.client
            .delete_collection(request)
            .await
            .map_err(|e| {
                VectorDataError::Storage(format!(
                    "failed to drop collection '{}': {e}",
                    self.collection_name
                ))
            })?;
        Ok(true)
    }

    #[tracing::instrument(skip(self, record), fields(document_id = %record.document_id, chunk_count = record.embedded_chunks.len()))]
    async fn upsert_document(&self, record: &VectorStoreRecord) -> VectorDataResult<()> {
        let mut points = Vec::with_capacity(record.embedded_chunks.len());

        for chunk in &record.embedded_chunks {
            let chunk_key = VectorStoreRecord::point_id(&record.document_id, chunk.chunk_index);
            let point_uuid = VectorStoreRecord::point_uuid(&record.document_id, chunk.chunk_index);

            // Start from the full document metadata (carries `trace_id` and
            // everything else the manager/stages attached) so it survives
            // into the persisted record, then layer the per-chunk fields on
            // top.
            let mut payload = json_object_to_payload(&record.metadata);
            payload.insert("chunk_key".to_string(), Value::from(chunk_key));
            payload.insert(
                "document_id".to_string(),
                Value::from(record.document_id.clone()),
            );
            payload.insert(
                "chunk_index".to_string(),
                Value::from(chunk.chunk_index as i64),
            );
            payload.insert("text".to_string(), Value::from(chunk.text.clone()));
            payload.insert(
                "embedding_model".to_string(),
                Value::from(record.vectors.model.clone()),
            );
            for (key, value) in &chunk.important_fields {
                if let Some(s) = value.as_str() {
                    payload.insert(key.clone(), Value::from(s.to_string()));
                }
            }

            points.push(PointStruct::new(
                point_uuid.to_string(),
                chunk.embedding.clone(),
                Payload::from(payload),
            ));
        }

        if points.is_empty() {
            return Ok(());
        }

        tracing::info!(
            document_id = %record.document_id,
            chunk_count = points.len(),
            "upserting document chunks"
        );

        let request = UpsertPoints {
            collection_name: self.collection_name.clone(),
            points,
            ..Default::default()
        };
        self.client
            .upsert_points(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("failed to upsert chunks: {e}")))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, query_embedding), fields(query_dim = query_embedding.len(), limit))]
    async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
        score_threshold: f32,
    ) -> VectorDataResult<Vec<SearchResult>> {
        let request = SearchPoints {
            collection_name: self.collection_name.clone(),
            vector: query_embedding,
            limit: limit as u64,
            score_threshold: Some(score_threshold),
            with_payload: Some(true.into()),
            ..Default::default()
        };

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("search failed: {e}")))?;

        let results = response
            .result
            .into_iter()
            .map(|scored_point| {
                let payload = &scored_point.payload;
                let text = payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let document_id = payload
                    .get("document_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let chunk_index = payload
                    .get("chunk_index")
                    .and_then(|v| v.as_integer())
                    .unwrap_or(0) as usize;

                let mut metadata = serde_json::Map::new();
                for (key, value) in payload {
                    if let Some(s) = value.as_str() {
                        metadata.insert(key.clone(), serde_json::Value::String(s.to_string()));
                    }
                }

                SearchResult {
                    text,
                    document_id,
                    chunk_index,
                    metadata: serde_json::Value::Object(metadata),
                    score: scored_point.score,
                }
            })
            .collect();

        Ok(results)
    }

    async fn delete_document(&self, document_id: &str) -> VectorDataResult<()> {
        let filter = Filter::must([qdrant_client::qdrant::Condition::matches(
            "document_id",
            document_id.to_string(),
        )]);

        let request = DeletePoints {
            collection_name: self.collection_name.clone(),
            points: Some(PointsSelector {
                points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
            }),
            ..Default::default()
        };

        self.client
            .delete_points(request)
            .await
            .context("failed to delete document points")?;
        Ok(())
    }

    async fn get_stats(&self) -> VectorDataResult<StorageStats> {
        use qdrant_client::qdrant::GetCollectionInfoRequest;

        let request = GetCollectionInfoRequest {
            collection_name: self.collection_name.clone(),
        };
        let info = self
            .client
            .collection_info(request)
            .await
            .context("failed to get collection info")?;
        let result = info
            .result
            .ok_or_else(|| VectorDataError::Other("missing collection info result".into()))?;

        Ok(StorageStats {
            vector_count: result.vectors_count.unwrap_or(0) as usize,
            storage_bytes: None,
            collection_name: self.collection_name.clone(),
            storage_type: "qdrant".to_string(),
        })
    }
}

/// Converts `metadata`'s top-level fields into a Qdrant payload map, one
/// entry per JSON scalar/array/object field. Non-object `metadata` (should
/// not occur, given `ApplicationConfig`/the chunk stage always hand over a
/// JSON object) yields an empty payload rather than erroring, since an
/// upsert should never fail on metadata it can't faithfully represent.
fn json_object_to_payload(metadata: &serde_json::Value) -> HashMap<String, Value> {
    let mut payload = HashMap::new();
    if let serde_json::Value::Object(map) = metadata {
        for (key, value) in map {
            if let Some(v) = json_value_to_qdrant(value) {
                payload.insert(key.clone(), v);
            }
        }
    }
    payload
}

/// Converts one JSON value into a Qdrant payload [`Value`]. Arrays and
/// nested objects are flattened to their JSON text, since `search` reads
/// the payload back into a flat `HashMap<String, serde_json::Value>` and
/// Qdrant's own struct/list value kinds aren't needed for anything this
/// store queries on. Returns `None` for `null`, matching the original
/// platform's "omit null metadata fields" behavior.
fn json_value_to_qdrant(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::from(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::from(i))
            } else {
                Some(Value::from(n.as_f64().unwrap_or_default()))
            }
        }
        serde_json::Value::String(s) => Some(Value::from(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Some(Value::from(value.to_string())),
    }
}
