//! LLM provider trait
//!
//! All LLM backends implement this trait; the orchestrators only ever see
//! `Arc<dyn LlmProvider>`.

use crate::error::{RagError, RagResult};
use crate::llm::types::{ChatChunk, ChatRequest, ChatResponse};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Streaming response type: chunks in arrival order, each independently
/// fallible so a mid-stream failure surfaces after the partial output.
pub type ChatStream = Pin<Box<dyn Stream<Item = RagResult<ChatChunk>> + Send>>;

/// Abstract chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and answer metadata.
    fn name(&self) -> &str;

    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;

    /// Send a chat completion request and wait for the full response.
    async fn chat(&self, request: ChatRequest) -> RagResult<ChatResponse>;

    /// Send a streaming chat completion request.
    async fn chat_stream(&self, _request: ChatRequest) -> RagResult<ChatStream> {
        Err(RagError::Generation(format!(
            "provider {} does not support streaming",
            self.name()
        )))
    }

    /// Cheap reachability probe used during orchestrator initialization.
    async fn health_check(&self) -> RagResult<()> {
        Ok(())
    }
}
