//! OpenAI-compatible chat provider
//!
//! Talks to any endpoint implementing the OpenAI chat-completions wire
//! format: OpenAI itself, Ollama, vLLM, LM Studio and friends. Streaming
//! uses the standard SSE framing (`data: {...}` lines terminated by
//! `data: [DONE]`).

use crate::config::RagSettings;
use ragweave_core::llm::{ChatChunk, ChatRequest, ChatResponse, ChatStream, LlmProvider};
use ragweave_core::{RagError, RagResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Provider connection settings.
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Base URL up to but not including `/chat/completions`.
    pub base_url: String,
    /// Bearer token; empty disables the Authorization header.
    pub api_key: String,
    /// Default model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: String::new(),
            model: "llama3.2".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiCompatConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            base_url: settings.llm_base_url.clone(),
            api_key: settings.llm_api_key.clone(),
            model: settings.llm_model.clone(),
            timeout_secs: settings.llm_timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP client for OpenAI-compatible chat APIs.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> RagResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Initialization(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client, config })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.config.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.config.api_key)
        }
    }

    /// Fill in the default model when the request does not name one.
    fn prepare(&self, mut request: ChatRequest) -> ChatRequest {
        if request.model.is_empty() {
            request.model = self.config.model.clone();
        }
        request
    }

    async fn error_from_response(response: reqwest::Response) -> RagError {
        let status = response.status().to_string();
        let body = response.text().await.unwrap_or_default();
        RagError::api(Some(status), body)
    }

    /// Pull complete SSE `data:` payloads out of the byte buffer.
    ///
    /// SSE frames are newline-delimited, so splitting on `\n` before
    /// UTF-8 conversion never cuts a multi-byte character in half.
    fn drain_sse_lines(buffer: &mut Vec<u8>) -> Vec<String> {
        let mut payloads = Vec::new();
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim().to_string());
            }
        }
        payloads
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, request: ChatRequest) -> RagResult<ChatResponse> {
        let mut request = self.prepare(request);
        request.stream = None;

        debug!(model = %request.model, messages = request.messages.len(), "sending chat request");
        let response = self
            .apply_auth(self.client.post(self.chat_url()))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let parsed: ChatResponse = response.json().await?;
        if parsed.choices.is_empty() {
            return Err(RagError::Generation("response contained no choices".into()));
        }
        Ok(parsed)
    }

    async fn chat_stream(&self, request: ChatRequest) -> RagResult<ChatStream> {
        let mut request = self.prepare(request);
        request.stream = Some(true);

        debug!(model = %request.model, "sending streaming chat request");
        let response = self
            .apply_auth(self.client.post(self.chat_url()))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let (tx, rx) = mpsc::channel::<RagResult<ChatChunk>>(32);
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            'outer: while let Some(item) = byte_stream.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(RagError::Network(format!("stream read failed: {e}"))))
                            .await;
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                for payload in Self::drain_sse_lines(&mut buffer) {
                    if payload == "[DONE]" {
                        break 'outer;
                    }
                    match serde_json::from_str::<ChatChunk>(&payload) {
                        Ok(chunk) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                // Receiver dropped; stop reading.
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "skipping malformed stream chunk");
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    /// Probe `GET {base}/models`, the cheapest universally-supported call.
    async fn health_check(&self) -> RagResult<()> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let response = self.apply_auth(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }
}
