//! LLM integration contracts
//!
//! Chat-completion wire types and the provider trait the orchestrators
//! generate against. The OpenAI-compatible HTTP provider lives in
//! `ragweave-engine`.

pub mod provider;
pub mod types;

pub use provider::{ChatStream, LlmProvider};
pub use types::{
    ChatChunk, ChatMessage, ChatRequest, ChatResponse, Choice, ChunkChoice, ChunkDelta, Role,
    Usage,
};
