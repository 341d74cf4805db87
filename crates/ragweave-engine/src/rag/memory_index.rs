//! In-memory vector index
//!
//! HashMap-backed [`VectorIndex`] used for tests, demos and small
//! single-process deployments. Search is a linear scan with cosine
//! distance, which is plenty below a few tens of thousands of records.

use crate::rag::similarity::cosine_distance;
use ragweave_core::rag::{CollectionInfo, DocRecord, SearchResult, VectorIndex};
use ragweave_core::{RagError, RagResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Thread-safe in-memory document store.
pub struct InMemoryVectorIndex {
    collection_name: String,
    documents: RwLock<HashMap<String, DocRecord>>,
    /// Fixed on the first insert; later records must match.
    dimension: RwLock<Option<usize>>,
}

impl InMemoryVectorIndex {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            documents: RwLock::new(HashMap::new()),
            dimension: RwLock::new(None),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new("documents")
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    /// Store a batch of records, skipping invalid ones.
    ///
    /// A record is skipped (with a warning) when it is missing an id,
    /// text or embedding, or when its embedding dimension disagrees
    /// with what the collection already holds. Returns the number of
    /// records actually stored. A batch that is empty, or where every
    /// record was skipped, is an error.
    async fn add_documents(&self, documents: Vec<DocRecord>) -> RagResult<usize> {
        if documents.is_empty() {
            return Err(RagError::EmptyBatch("no documents to add".into()));
        }

        let mut dimension = self.dimension.write().await;
        let mut store = self.documents.write().await;
        let mut added = 0;

        for record in documents {
            if !record.is_valid() {
                warn!(id = %record.id, "skipping invalid document record");
                continue;
            }
            match *dimension {
                Some(dim) if record.embedding.len() != dim => {
                    warn!(
                        id = %record.id,
                        expected = dim,
                        actual = record.embedding.len(),
                        "skipping record with mismatched embedding dimension"
                    );
                    continue;
                }
                None => *dimension = Some(record.embedding.len()),
                _ => {}
            }
            store.insert(record.id.clone(), record);
            added += 1;
        }

        if added == 0 {
            return Err(RagError::EmptyBatch(
                "no valid documents left in batch after filtering".into(),
            ));
        }

        debug!(added, total = store.len(), "added documents to in-memory index");
        Ok(added)
    }

    /// Linear-scan nearest neighbours, ascending by cosine distance.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> RagResult<Vec<SearchResult>> {
        if query.is_empty() {
            return Err(RagError::Query("query embedding is empty".into()));
        }
        if let Some(dim) = *self.dimension.read().await
            && query.len() != dim
        {
            return Err(RagError::dimension_mismatch(dim, query.len()));
        }

        let store = self.documents.read().await;
        let mut results = Vec::with_capacity(store.len());
        for record in store.values() {
            if let Some(wanted) = filter
                && !wanted
                    .iter()
                    .all(|(key, value)| record.metadata.get(key) == Some(value))
            {
                continue;
            }
            let distance = cosine_distance(query, &record.embedding)?;
            results.push(SearchResult::from_record(record, distance));
        }

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }

    async fn delete_documents(&self, ids: &[String]) -> RagResult<usize> {
        if ids.is_empty() {
            return Err(RagError::Validation("no document ids given".into()));
        }
        let mut store = self.documents.write().await;
        let mut removed = 0;
        for id in ids {
            if store.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn collection_info(&self) -> RagResult<CollectionInfo> {
        let store = self.documents.read().await;
        Ok(CollectionInfo {
            name: self.collection_name.clone(),
            count: store.len(),
            url: "memory://local".to_string(),
        })
    }

    async fn reset_collection(&self) -> RagResult<()> {
        self.documents.write().await.clear();
        *self.dimension.write().await = None;
        debug!(collection = %self.collection_name, "reset in-memory collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str, embedding: Vec<f32>) -> DocRecord {
        DocRecord::new(id, text, embedding)
    }

    #[tokio::test]
    async fn test_add_and_count() {
        let index = InMemoryVectorIndex::new("test");
        let added = index
            .add_documents(vec![
                record("1", "first", vec![1.0, 0.0]),
                record("2", "second", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(index.len().await, 2);

        let info = index.collection_info().await.unwrap();
        assert_eq!(info.name, "test");
        assert_eq!(info.count, 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_an_error() {
        let index = InMemoryVectorIndex::new("test");
        assert!(matches!(
            index.add_documents(vec![]).await,
            Err(RagError::EmptyBatch(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_records_are_skipped() {
        let index = InMemoryVectorIndex::new("test");
        let added = index
            .add_documents(vec![
                record("1", "good", vec![1.0, 0.0]),
                record("", "no id", vec![1.0, 0.0]),
                record("3", "", vec![1.0, 0.0]),
                record("4", "wrong dim", vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_batch_with_no_survivors_is_an_error() {
        let index = InMemoryVectorIndex::new("test");
        let result = index
            .add_documents(vec![
                record("", "no id", vec![1.0, 0.0]),
                record("2", "no embedding", vec![]),
            ])
            .await;
        assert!(matches!(result, Err(RagError::EmptyBatch(_))));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_search_with_metadata_filter() {
        let index = InMemoryVectorIndex::new("test");
        index
            .add_documents(vec![
                record("a", "from notes", vec![1.0, 0.0]).with_metadata("source_file", "notes.md"),
                record("b", "from readme", vec![0.9, 0.1])
                    .with_metadata("source_file", "readme.md"),
            ])
            .await
            .unwrap();

        let mut filter = HashMap::new();
        filter.insert("source_file".to_string(), "readme.md".to_string());
        let results = index.search(&[1.0, 0.0], 5, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "b");

        filter.insert("source_type".to_string(), "pdf".to_string());
        let results = index.search(&[1.0, 0.0], 5, Some(&filter)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_by_distance() {
        let index = InMemoryVectorIndex::new("test");
        index
            .add_documents(vec![
                record("far", "opposite direction", vec![0.0, 1.0]),
                record("near", "same direction", vec![1.0, 0.0]),
                record("mid", "in between", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0], 3, None).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "near");
        assert_eq!(results[1].id, "mid");
        assert_eq!(results[2].id, "far");
        assert!(results[0].distance <= results[1].distance);
        assert!(results[1].distance <= results[2].distance);
    }

    #[tokio::test]
    async fn test_search_truncates_to_k() {
        let index = InMemoryVectorIndex::new("test");
        index
            .add_documents(vec![
                record("1", "a", vec![1.0, 0.0]),
                record("2", "b", vec![0.9, 0.1]),
                record("3", "c", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        let results = index.search(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_search_rejects_mismatched_query() {
        let index = InMemoryVectorIndex::new("test");
        index
            .add_documents(vec![record("1", "a", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1, None).await,
            Err(RagError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn test_search_on_empty_collection() {
        let index = InMemoryVectorIndex::new("test");
        let results = index.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_reset() {
        let index = InMemoryVectorIndex::new("test");
        index
            .add_documents(vec![
                record("1", "a", vec![1.0, 0.0]),
                record("2", "b", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        assert!(matches!(
            index.delete_documents(&[]).await,
            Err(RagError::Validation(_))
        ));

        let removed = index
            .delete_documents(&["1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(index.len().await, 1);

        index.reset_collection().await.unwrap();
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = InMemoryVectorIndex::new("test");
        index
            .add_documents(vec![record("1", "old text", vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .add_documents(vec![record("1", "new text", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(index.len().await, 1);
        let results = index.search(&[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(results[0].text, "new text");
    }
}
