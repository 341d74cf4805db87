//! VectorIndex trait definition
//!
//! Abstract interface over an external vector database collection.
//! Concrete clients (InMemoryVectorIndex, QdrantVectorIndex) live in
//! `ragweave-engine`.

use crate::error::RagResult;
use crate::rag::types::{CollectionInfo, DocRecord, SearchResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// Typed wrapper over a named collection in an external vector database.
///
/// All operations are idempotent-safe against a missing collection
/// (implementations auto-create it on first use) and must be safe for
/// concurrent use: many queries and ingests may run against one shared
/// client. Operations are independent network calls — nothing is
/// transactional across calls, and partial success is reported through
/// returned counts rather than raised as an error.
///
/// # Example
///
/// ```rust,ignore
/// use ragweave_core::rag::{VectorIndex, DocRecord};
///
/// let added = index.add_documents(records).await?;
/// let hits = index.search(&query_embedding, 5, None).await?;
/// for hit in hits {
///     println!("{:.3}: {}", hit.distance, hit.text);
/// }
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a batch of records.
    ///
    /// Items missing id, text or embedding are skipped with a warning;
    /// returns the number actually stored. Fails with
    /// `RagError::EmptyBatch` when the batch itself is empty or when no
    /// record survives the skip filtering.
    async fn add_documents(&self, items: Vec<DocRecord>) -> RagResult<usize>;

    /// Approximate nearest-neighbor search.
    ///
    /// Returns up to `k` results ordered by ascending distance (most
    /// similar first). When `filter` is given, only records whose
    /// metadata contains every listed key/value pair are considered.
    /// Fails with `RagError::Query` when the query embedding is empty
    /// and `RagError::DimensionMismatch` when it does not match the
    /// collection's dimension.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> RagResult<Vec<SearchResult>>;

    /// Delete records by id, returning how many were removed. Unknown
    /// ids are ignored; an empty id list fails with
    /// `RagError::Validation`.
    async fn delete_documents(&self, ids: &[String]) -> RagResult<usize>;

    /// Name, record count and endpoint of the underlying collection.
    async fn collection_info(&self) -> RagResult<CollectionInfo>;

    /// Destructive: drop and recreate the collection.
    async fn reset_collection(&self) -> RagResult<()>;

    /// Cheap reachability probe used during orchestrator initialization.
    async fn health_check(&self) -> RagResult<()> {
        Ok(())
    }
}
