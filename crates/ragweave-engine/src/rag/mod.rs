//! RAG implementations: chunking, embedding, similarity, vector indexes
//! and the pipeline orchestrator.

pub mod chunker;
pub mod embedder;
pub mod memory_index;
pub mod orchestrator;
#[cfg(feature = "qdrant")]
pub mod qdrant_index;
pub mod similarity;

pub use chunker::{ChunkerConfig, TextChunker};
pub use embedder::HashEmbedder;
pub use memory_index::InMemoryVectorIndex;
pub use orchestrator::{AnswerStream, OrchestratorState, RagOrchestrator, NO_DOCUMENTS_MESSAGE};
#[cfg(feature = "qdrant")]
pub use qdrant_index::{QdrantIndexConfig, QdrantVectorIndex};
pub use similarity::{cosine_distance, cosine_similarity};
