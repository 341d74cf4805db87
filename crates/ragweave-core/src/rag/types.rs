//! RAG core data types
//!
//! Types used across the chunking, embedding and retrieval interfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Format of the document a chunk was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Markdown,
    Text,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }
}

/// A chunk span produced by the chunker before source identity is attached.
///
/// `start_index` and `length` are character offsets into the original text.
/// Drafts are finalized into [`TextChunk`]s once the source file is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub text: String,
    pub start_index: usize,
    pub length: usize,
    pub chunk_index: usize,
}

/// A bounded contiguous span of a source document, stored and retrieved
/// independently.
///
/// Immutable once stored; identity is `id` (a generated UUID). Chunks
/// sharing a `source_file` carry contiguous `chunk_index` values starting
/// at 0 in text order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: String,
    pub text: String,
    pub start_index: usize,
    pub length: usize,
    pub chunk_index: usize,
    pub source_file: String,
    pub source_type: SourceType,
    pub uploaded_at: DateTime<Utc>,
    pub size_bytes: usize,
    /// Set by the ingest pipeline; always dimension D once present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl TextChunk {
    /// Finalize a draft with source identity and a fresh id.
    pub fn from_draft(draft: ChunkDraft, source_file: impl Into<String>, source_type: SourceType) -> Self {
        let size_bytes = draft.text.len();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: draft.text,
            start_index: draft.start_index,
            length: draft.length,
            chunk_index: draft.chunk_index,
            source_file: source_file.into(),
            source_type,
            uploaded_at: Utc::now(),
            size_bytes,
            embedding: None,
        }
    }

    /// Attach an embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Flatten into the record shape the vector index stores.
    ///
    /// Returns `None` if the chunk has no embedding yet.
    pub fn into_record(self) -> Option<DocRecord> {
        let embedding = self.embedding?;
        let mut metadata = HashMap::new();
        metadata.insert("source_file".to_string(), self.source_file);
        metadata.insert("source_type".to_string(), self.source_type.as_str().to_string());
        metadata.insert("chunk_index".to_string(), self.chunk_index.to_string());
        metadata.insert("start_index".to_string(), self.start_index.to_string());
        metadata.insert("size_bytes".to_string(), self.size_bytes.to_string());
        metadata.insert("uploaded_at".to_string(), self.uploaded_at.to_rfc3339());
        Some(DocRecord {
            id: self.id,
            text: self.text,
            embedding,
            metadata,
        })
    }
}

/// The unit stored in a vector index: id, text, embedding and flat metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

impl DocRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// A record is storable when id, text and embedding are all present.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.text.is_empty() && !self.embedding.is_empty()
    }
}

/// Result returned from a vector similarity search.
///
/// `distance` is ascending-better: lower means more similar. For cosine
/// collections it is `1 - cosine_similarity`, in `[0, 2]` (and `[0, 1]`
/// for unit vectors with non-negative similarity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub distance: f32,
    pub metadata: HashMap<String, String>,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, text: impl Into<String>, distance: f32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            distance,
            metadata: HashMap::new(),
        }
    }

    /// Create from a stored record with a computed distance.
    pub fn from_record(record: &DocRecord, distance: f32) -> Self {
        Self {
            id: record.id.clone(),
            text: record.text.clone(),
            distance,
            metadata: record.metadata.clone(),
        }
    }

    /// Relevance percentage shown to users: `round((1 - distance) * 100)`.
    pub fn relevance_percent(&self) -> i32 {
        ((1.0 - self.distance) * 100.0).round() as i32
    }
}

/// Collection statistics reported by a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
    pub url: String,
}

/// Metadata attached to a completed answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMetadata {
    pub query: String,
    pub documents_retrieved: usize,
    pub model_name: String,
}

/// A grounded answer: generated text plus the context and sources behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub response_text: String,
    pub context: String,
    pub sources: Vec<SearchResult>,
    pub metadata: AnswerMetadata,
}

/// An event emitted by the streaming query pipeline.
///
/// Token events carry partial text in arrival order; a single `Done`
/// event delivers the final metadata after the text stream ends.
#[derive(Debug, Clone)]
pub enum AnswerEvent {
    Token(String),
    Done { metadata: AnswerMetadata },
}

impl AnswerEvent {
    pub fn token(content: impl Into<String>) -> Self {
        Self::Token(content.into())
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(s) => Some(s),
            Self::Done { .. } => None,
        }
    }
}

/// Outcome of a (possibly partial) ingest: how many chunks survived
/// embedding and storage out of how many were submitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IngestReport {
    pub chunks_added: usize,
    pub total_chunks: usize,
}

impl IngestReport {
    /// True when at least one chunk was dropped along the way.
    pub fn is_partial(&self) -> bool {
        self.chunks_added < self.total_chunks
    }
}
