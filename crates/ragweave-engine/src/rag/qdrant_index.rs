//! Qdrant-backed vector index
//!
//! Persistent [`VectorIndex`] for deployments that outgrow the in-memory
//! index. Records become Qdrant points: the embedding is the vector,
//! text and metadata live in the payload. String record ids are mapped
//! to u64 point ids with a deterministic hash; the original id is kept
//! in the payload so results round-trip losslessly.

use ragweave_core::rag::{CollectionInfo, DocRecord, SearchResult, VectorIndex};
use ragweave_core::{RagError, RagResult};
use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointStruct, PointsIdsList, QueryPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::{info, warn};

const PAYLOAD_KEY_ORIGINAL_ID: &str = "_original_id";
const PAYLOAD_KEY_TEXT: &str = "_text";
const PAYLOAD_KEY_METADATA_PREFIX: &str = "meta_";

/// Connection settings for a Qdrant instance.
pub struct QdrantIndexConfig {
    /// Qdrant server URL (e.g., "http://localhost:6334")
    pub url: String,
    /// Optional API key for Qdrant Cloud or authenticated instances
    pub api_key: Option<String>,
    /// Name of the collection to use
    pub collection_name: String,
    /// Dimensionality of embedding vectors
    pub vector_dimensions: u64,
}

/// Qdrant-backed document index using cosine distance.
pub struct QdrantVectorIndex {
    client: Qdrant,
    url: String,
    collection_name: String,
    vector_dimensions: u64,
}

/// Deterministic string-to-u64 id mapping for Qdrant point ids.
fn string_id_to_u64(id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

fn extract_string(val: &qdrant_client::qdrant::Value) -> Option<&str> {
    match &val.kind {
        Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

impl QdrantVectorIndex {
    /// Connect to Qdrant and create the collection if it does not exist.
    pub async fn new(config: QdrantIndexConfig) -> RagResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Initialization(format!("Qdrant connection failed: {e}")))?;

        let index = Self {
            client,
            url: config.url,
            collection_name: config.collection_name,
            vector_dimensions: config.vector_dimensions,
        };
        index.ensure_collection_exists().await?;
        Ok(index)
    }

    async fn ensure_collection_exists(&self) -> RagResult<()> {
        let exists = self
            .client
            .collection_exists(&self.collection_name)
            .await
            .map_err(|e| RagError::Retrieval(format!("Qdrant collection check failed: {e}")))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection_name).vectors_config(
                        VectorParamsBuilder::new(self.vector_dimensions, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| {
                    RagError::Initialization(format!(
                        "failed to create Qdrant collection '{}': {e}",
                        self.collection_name
                    ))
                })?;
            info!(collection = %self.collection_name, "created Qdrant collection");
        }
        Ok(())
    }

    fn record_to_point(record: &DocRecord) -> PointStruct {
        let point_id = string_id_to_u64(&record.id);

        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert(PAYLOAD_KEY_ORIGINAL_ID.to_string(), record.id.clone().into());
        payload.insert(PAYLOAD_KEY_TEXT.to_string(), record.text.clone().into());
        for (key, value) in &record.metadata {
            payload.insert(
                format!("{PAYLOAD_KEY_METADATA_PREFIX}{key}"),
                value.clone().into(),
            );
        }

        PointStruct::new(point_id, record.embedding.clone(), payload)
    }

    fn scored_point_to_result(point: &qdrant_client::qdrant::ScoredPoint) -> SearchResult {
        let payload = &point.payload;

        let id = payload
            .get(PAYLOAD_KEY_ORIGINAL_ID)
            .and_then(extract_string)
            .unwrap_or_default()
            .to_string();
        let text = payload
            .get(PAYLOAD_KEY_TEXT)
            .and_then(extract_string)
            .unwrap_or_default()
            .to_string();

        let mut metadata = HashMap::new();
        for (key, val) in payload {
            if let Some(meta_key) = key.strip_prefix(PAYLOAD_KEY_METADATA_PREFIX)
                && let Some(s) = extract_string(val)
            {
                metadata.insert(meta_key.to_string(), s.to_string());
            }
        }

        // Qdrant reports cosine similarity; the pipeline works in
        // ascending-better distance.
        SearchResult {
            id,
            text,
            distance: 1.0 - point.score,
            metadata,
        }
    }

    /// Metadata equality filter over the prefixed payload keys.
    fn metadata_filter(filter: &HashMap<String, String>) -> Filter {
        Filter::must(filter.iter().map(|(key, value)| {
            Condition::matches(
                format!("{PAYLOAD_KEY_METADATA_PREFIX}{key}"),
                value.clone(),
            )
        }))
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn add_documents(&self, documents: Vec<DocRecord>) -> RagResult<usize> {
        if documents.is_empty() {
            return Err(RagError::EmptyBatch("no documents to add".into()));
        }

        let points: Vec<PointStruct> = documents
            .iter()
            .filter(|r| {
                if r.is_valid() && r.embedding.len() as u64 == self.vector_dimensions {
                    true
                } else {
                    warn!(id = %r.id, "skipping invalid document record");
                    false
                }
            })
            .map(Self::record_to_point)
            .collect();

        if points.is_empty() {
            return Err(RagError::EmptyBatch(
                "no valid documents left in batch after filtering".into(),
            ));
        }
        let added = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(|e| RagError::Retrieval(format!("Qdrant upsert failed: {e}")))?;
        Ok(added)
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> RagResult<Vec<SearchResult>> {
        if query.is_empty() {
            return Err(RagError::Query("query embedding is empty".into()));
        }
        if query.len() as u64 != self.vector_dimensions {
            return Err(RagError::dimension_mismatch(
                self.vector_dimensions as usize,
                query.len(),
            ));
        }

        let mut request = QueryPointsBuilder::new(&self.collection_name)
            .query(query.to_vec())
            .limit(k as u64)
            .with_payload(true);
        if let Some(wanted) = filter
            && !wanted.is_empty()
        {
            request = request.filter(Self::metadata_filter(wanted));
        }

        let response = self
            .client
            .query(request)
            .await
            .map_err(|e| RagError::Retrieval(format!("Qdrant search failed: {e}")))?;

        Ok(response
            .result
            .iter()
            .map(Self::scored_point_to_result)
            .collect())
    }

    /// Qdrant does not report how many of the points existed, so the
    /// returned count is the number of ids requested.
    async fn delete_documents(&self, ids: &[String]) -> RagResult<usize> {
        if ids.is_empty() {
            return Err(RagError::Validation("no document ids given".into()));
        }
        let point_ids = ids
            .iter()
            .map(|id| string_id_to_u64(id).into())
            .collect();
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(|e| RagError::Retrieval(format!("Qdrant delete failed: {e}")))?;
        Ok(ids.len())
    }

    async fn collection_info(&self) -> RagResult<CollectionInfo> {
        let result = self
            .client
            .count(CountPointsBuilder::new(&self.collection_name))
            .await
            .map_err(|e| RagError::Retrieval(format!("Qdrant count failed: {e}")))?;
        Ok(CollectionInfo {
            name: self.collection_name.clone(),
            count: result.result.map(|c| c.count as usize).unwrap_or(0),
            url: self.url.clone(),
        })
    }

    /// Delete and recreate the collection.
    async fn reset_collection(&self) -> RagResult<()> {
        let _ = self.client.delete_collection(&self.collection_name).await;
        self.ensure_collection_exists().await
    }

    async fn health_check(&self) -> RagResult<()> {
        self.client
            .health_check()
            .await
            .map_err(|e| RagError::Initialization(format!("Qdrant unreachable: {e}")))?;
        Ok(())
    }
}
