//! Engine configuration
//!
//! One settings struct covering the chunker, embedder, vector index,
//! LLM provider and task orchestration. Every field has a working
//! default and can be overridden from `RAGWEAVE_*` environment
//! variables or the `with_*` builders.

use ragweave_core::{RagError, RagResult};
use serde::{Deserialize, Serialize};

/// Tunable settings for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Embedding vector dimension.
    pub embedding_dim: usize,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Character overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of nearest neighbours retrieved per query.
    pub top_k: usize,
    /// Vector index collection name.
    pub collection_name: String,
    /// Vector database endpoint (Qdrant backend).
    pub vector_db_url: String,
    /// Base URL of the OpenAI-compatible chat API.
    pub llm_base_url: String,
    /// API key sent as a bearer token; empty disables the header.
    pub llm_api_key: String,
    /// Model requested when a call does not name one.
    pub llm_model: String,
    /// LLM request timeout in seconds.
    pub llm_timeout_secs: u64,
    /// Webhook URL that triggers external tasks.
    pub trigger_webhook_url: String,
    /// Webhook URL notified when a task completes.
    pub completion_webhook_url: String,
    /// Webhook request timeout in seconds.
    pub webhook_timeout_secs: u64,
    /// Wall-clock budget for waiting on a task, in milliseconds.
    pub task_timeout_ms: u64,
    /// Interval between completion polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            embedding_dim: 384,
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            collection_name: "documents".to_string(),
            vector_db_url: "http://localhost:6334".to_string(),
            llm_base_url: "http://localhost:11434/v1".to_string(),
            llm_api_key: String::new(),
            llm_model: "llama3.2".to_string(),
            llm_timeout_secs: 60,
            trigger_webhook_url: String::new(),
            completion_webhook_url: String::new(),
            webhook_timeout_secs: 10,
            task_timeout_ms: 300_000,
            poll_interval_ms: 2_000,
        }
    }
}

impl RagSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from `RAGWEAVE_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(v) = std::env::var("RAGWEAVE_EMBEDDING_DIM")
            && let Ok(n) = v.parse()
        {
            settings.embedding_dim = n;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_CHUNK_SIZE")
            && let Ok(n) = v.parse()
        {
            settings.chunk_size = n;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_CHUNK_OVERLAP")
            && let Ok(n) = v.parse()
        {
            settings.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_TOP_K")
            && let Ok(n) = v.parse()
        {
            settings.top_k = n;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_COLLECTION") {
            settings.collection_name = v;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_VECTOR_DB_URL") {
            settings.vector_db_url = v;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_LLM_BASE_URL") {
            settings.llm_base_url = v;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_LLM_API_KEY") {
            settings.llm_api_key = v;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_LLM_MODEL") {
            settings.llm_model = v;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_TRIGGER_WEBHOOK_URL") {
            settings.trigger_webhook_url = v;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_COMPLETION_WEBHOOK_URL") {
            settings.completion_webhook_url = v;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_TASK_TIMEOUT_MS")
            && let Ok(n) = v.parse()
        {
            settings.task_timeout_ms = n;
        }
        if let Ok(v) = std::env::var("RAGWEAVE_POLL_INTERVAL_MS")
            && let Ok(n) = v.parse()
        {
            settings.poll_interval_ms = n;
        }
        settings
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    pub fn with_llm(mut self, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        self.llm_base_url = base_url.into();
        self.llm_model = model.into();
        self
    }

    pub fn with_webhooks(
        mut self,
        trigger_url: impl Into<String>,
        completion_url: impl Into<String>,
    ) -> Self {
        self.trigger_webhook_url = trigger_url.into();
        self.completion_webhook_url = completion_url.into();
        self
    }

    pub fn with_task_timing(mut self, timeout_ms: u64, poll_interval_ms: u64) -> Self {
        self.task_timeout_ms = timeout_ms;
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Reject settings combinations the pipeline cannot run with.
    pub fn validate(&self) -> RagResult<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embedding_dim < crate::rag::embedder::MIN_EMBEDDING_DIM {
            return Err(RagError::Config(format!(
                "embedding_dim must be at least {}",
                crate::rag::embedder::MIN_EMBEDDING_DIM
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(RagError::Config("poll_interval_ms must be positive".into()));
        }
        Ok(())
    }
}
