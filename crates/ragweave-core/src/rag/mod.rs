//! RAG data model and trait seams
//!
//! Types shared by the chunker, embedders and vector index clients, plus
//! the abstract `Embedder` and `VectorIndex` interfaces implemented in
//! `ragweave-engine`.

pub mod embedder;
pub mod types;
pub mod vector_index;

pub use embedder::Embedder;
pub use types::{
    AnswerEvent, AnswerMetadata, ChunkDraft, CollectionInfo, DocRecord, IngestReport, RagAnswer,
    SearchResult, SourceType, TextChunk,
};
pub use vector_index::VectorIndex;
