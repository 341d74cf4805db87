//! Ragweave Engine
//!
//! Concrete implementations behind the `ragweave-core` contracts:
//! text chunking, deterministic feature embedding, in-memory and Qdrant
//! vector indexes, an OpenAI-compatible LLM provider, the RAG
//! orchestrator and the long-running task orchestrator.

pub mod config;
pub mod llm;
pub mod rag;
pub mod task;

pub use config::RagSettings;
pub use llm::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use rag::chunker::{ChunkerConfig, TextChunker};
pub use rag::embedder::HashEmbedder;
pub use rag::memory_index::InMemoryVectorIndex;
pub use rag::orchestrator::{AnswerStream, OrchestratorState, RagOrchestrator};
#[cfg(feature = "qdrant")]
pub use rag::qdrant_index::{QdrantIndexConfig, QdrantVectorIndex};
pub use task::orchestrator::{PollTableWatcher, TaskOrchestrator, TaskWaitHandle};
pub use task::webhook::{WebhookClient, WebhookConfig};
