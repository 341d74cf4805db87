//! RAG pipeline orchestrator
//!
//! Wires the chunker, embedder, vector index and LLM provider into the
//! full retrieval-augmented flow: ingest documents, retrieve context
//! for a query, build a grounded prompt and generate an answer, either
//! as a complete response or as a token stream.

use crate::config::RagSettings;
use crate::rag::chunker::{ChunkerConfig, TextChunker};
use ragweave_core::llm::{ChatRequest, LlmProvider};
use ragweave_core::rag::{
    AnswerEvent, AnswerMetadata, Embedder, IngestReport, RagAnswer, SearchResult, SourceType,
    TextChunk, VectorIndex,
};
use ragweave_core::{RagError, RagResult};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Context sentinel used when retrieval finds nothing; the LLM is still
/// asked, grounded on this string instead of document text.
pub const NO_DOCUMENTS_MESSAGE: &str = "No relevant documents found in the knowledge base.";

/// Event stream produced by a streaming query.
pub type AnswerStream = Pin<Box<dyn Stream<Item = RagResult<AnswerEvent>> + Send>>;

/// Orchestrator lifecycle state.
///
/// Backends are verified once and the result cached; a failed
/// initialization returns to `Uninitialized` so the next call retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Retrieval-augmented generation pipeline.
pub struct RagOrchestrator {
    settings: RagSettings,
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    state: RwLock<OrchestratorState>,
}

impl RagOrchestrator {
    pub fn new(
        settings: RagSettings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmProvider>,
    ) -> RagResult<Self> {
        settings.validate()?;
        let chunker = TextChunker::new(ChunkerConfig {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        })?;
        Ok(Self {
            settings,
            chunker,
            embedder,
            index,
            llm,
            state: RwLock::new(OrchestratorState::Uninitialized),
        })
    }

    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Verify all three components: embedder, vector index, LLM provider.
    ///
    /// The network probes run concurrently. Idempotent once ready; a
    /// failure leaves the orchestrator uninitialized so a later call
    /// retries.
    pub async fn initialize(&self) -> RagResult<()> {
        let mut state = self.state.write().await;
        if *state == OrchestratorState::Ready {
            return Ok(());
        }
        *state = OrchestratorState::Initializing;

        if let Err(e) = self.embedder.embed("healthcheck") {
            *state = OrchestratorState::Uninitialized;
            return Err(RagError::Initialization(format!(
                "embedder verification failed: {e}"
            )));
        }

        let result = tokio::try_join!(self.index.health_check(), self.llm.health_check());
        match result {
            Ok(_) => {
                *state = OrchestratorState::Ready;
                info!(
                    provider = self.llm.name(),
                    collection = %self.settings.collection_name,
                    "RAG orchestrator initialized"
                );
                Ok(())
            }
            Err(e) => {
                *state = OrchestratorState::Uninitialized;
                Err(RagError::Initialization(format!(
                    "backend verification failed: {e}"
                )))
            }
        }
    }

    /// Initialize lazily on first use.
    async fn ensure_ready(&self) -> RagResult<()> {
        if *self.state.read().await == OrchestratorState::Ready {
            return Ok(());
        }
        self.initialize().await
    }

    /// Chunk a document, embed every chunk and store the survivors.
    pub async fn chunk_and_ingest(
        &self,
        text: &str,
        source_file: &str,
        source_type: SourceType,
    ) -> RagResult<IngestReport> {
        let chunks = self.chunker.chunk_document(text, source_file, source_type)?;
        self.add_document_to_knowledge_base(chunks).await
    }

    /// Embed and store already-chunked text.
    ///
    /// Chunks whose embedding fails are dropped with a warning rather
    /// than failing the whole document; the report says how many made
    /// it in.
    pub async fn add_document_to_knowledge_base(
        &self,
        chunks: Vec<TextChunk>,
    ) -> RagResult<IngestReport> {
        self.ensure_ready().await?;
        if chunks.is_empty() {
            return Err(RagError::EmptyInput("document produced no chunks".into()));
        }
        let total_chunks = chunks.len();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;

        let mut records = Vec::with_capacity(total_chunks);
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            match embedding {
                Some(vector) => {
                    if let Some(record) = chunk.with_embedding(vector).into_record() {
                        records.push(record);
                    }
                }
                None => {
                    warn!(
                        source = %chunk.source_file,
                        chunk_index = chunk.chunk_index,
                        "dropping chunk that failed to embed"
                    );
                }
            }
        }

        if records.is_empty() {
            return Err(RagError::Embedding(
                "no chunk in the document could be embedded".into(),
            ));
        }

        let chunks_added = self.index.add_documents(records).await?;
        let report = IngestReport {
            chunks_added,
            total_chunks,
        };
        if report.is_partial() {
            warn!(
                added = report.chunks_added,
                total = report.total_chunks,
                "partial ingest"
            );
        } else {
            debug!(added = report.chunks_added, "ingested document");
        }
        Ok(report)
    }

    /// Retrieve the nearest chunks for a query, using the configured `top_k`.
    pub async fn retrieve(&self, query: &str) -> RagResult<Vec<SearchResult>> {
        self.retrieve_top_k(query, self.settings.top_k).await
    }

    async fn retrieve_top_k(&self, query: &str, top_k: usize) -> RagResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(RagError::Query("query must not be empty".into()));
        }
        if top_k == 0 {
            return Err(RagError::Validation("top_k must be positive".into()));
        }
        let embedding = self
            .embedder
            .embed(query)
            .map_err(|e| RagError::Embedding(format!("embedding query '{query}' failed: {e}")))?;
        self.index
            .search(&embedding, top_k, None)
            .await
            .map_err(|e| RagError::Retrieval(format!("search for '{query}' failed: {e}")))
    }

    /// Format retrieved chunks into the context block of the prompt.
    fn build_context(sources: &[SearchResult]) -> String {
        sources
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let file_tag = result
                    .metadata
                    .get("source_file")
                    .map(|f| format!(" (file: {f})"))
                    .unwrap_or_default();
                format!(
                    "[Source {}] (relevance: {}%){}\n{}",
                    i + 1,
                    result.relevance_percent(),
                    file_tag,
                    result.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn build_prompt(context: &str, query: &str) -> String {
        format!("Context:\n{context}\n\nQuestion: {query}\n\nAnswer:")
    }

    fn grounded_request(&self, context: &str, query: &str) -> ChatRequest {
        ChatRequest::new(self.settings.llm_model.clone())
            .system("Answer the question using only the provided context. If the context does not contain the answer, say so.")
            .user(Self::build_prompt(context, query))
    }

    fn answer_metadata(&self, query: &str, documents_retrieved: usize) -> AnswerMetadata {
        AnswerMetadata {
            query: query.to_string(),
            documents_retrieved,
            model_name: self.settings.llm_model.clone(),
        }
    }

    /// Answer a query with retrieval-grounded generation, using the
    /// configured `top_k`.
    pub async fn process_query(&self, query: &str) -> RagResult<RagAnswer> {
        self.process_query_with_top_k(query, self.settings.top_k)
            .await
    }

    /// Answer a query, retrieving up to `top_k` chunks for this call only.
    ///
    /// When retrieval finds nothing the context becomes the fixed
    /// no-documents sentinel and the LLM is asked anyway, so it can say
    /// the knowledge base holds no answer.
    pub async fn process_query_with_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> RagResult<RagAnswer> {
        self.ensure_ready().await?;
        let sources = self.retrieve_top_k(query, top_k).await?;
        debug!(query, retrieved = sources.len(), "retrieval complete");

        let context = if sources.is_empty() {
            NO_DOCUMENTS_MESSAGE.to_string()
        } else {
            Self::build_context(&sources)
        };
        let response = self
            .llm
            .chat(self.grounded_request(&context, query))
            .await?;
        let response_text = response
            .content()
            .ok_or_else(|| RagError::Generation("empty completion".into()))?
            .to_string();

        Ok(RagAnswer {
            metadata: self.answer_metadata(query, sources.len()),
            response_text,
            context,
            sources,
        })
    }

    /// Answer a query with streaming generation.
    ///
    /// Returns the retrieved sources immediately together with an event
    /// stream: `Token` events in arrival order, then one `Done` with the
    /// answer metadata. A mid-generation failure surfaces as an `Err`
    /// item after whatever tokens already arrived.
    pub async fn process_query_streaming(
        &self,
        query: &str,
    ) -> RagResult<(Vec<SearchResult>, AnswerStream)> {
        self.process_query_streaming_with_top_k(query, self.settings.top_k)
            .await
    }

    /// Streaming variant with a per-call `top_k` override.
    pub async fn process_query_streaming_with_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> RagResult<(Vec<SearchResult>, AnswerStream)> {
        self.ensure_ready().await?;
        let sources = self.retrieve_top_k(query, top_k).await?;
        let metadata = self.answer_metadata(query, sources.len());

        let (tx, rx) = mpsc::channel::<RagResult<AnswerEvent>>(32);

        let context = if sources.is_empty() {
            NO_DOCUMENTS_MESSAGE.to_string()
        } else {
            Self::build_context(&sources)
        };
        let mut chunk_stream = self
            .llm
            .chat_stream(self.grounded_request(&context, query))
            .await?;

        tokio::spawn(async move {
            while let Some(item) = chunk_stream.next().await {
                match item {
                    Ok(chunk) => {
                        if let Some(content) = chunk.delta_content()
                            && !content.is_empty()
                            && tx.send(Ok(AnswerEvent::token(content))).await.is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
            let _ = tx.send(Ok(AnswerEvent::Done { metadata })).await;
        });

        Ok((sources, Box::pin(ReceiverStream::new(rx))))
    }

    /// Collection statistics from the underlying index.
    pub async fn knowledge_base_info(&self) -> RagResult<ragweave_core::rag::CollectionInfo> {
        self.index.collection_info().await
    }

    /// Drop every stored document.
    pub async fn clear_knowledge_base(&self) -> RagResult<()> {
        self.index.reset_collection().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embedder::HashEmbedder;
    use crate::rag::memory_index::InMemoryVectorIndex;
    use ragweave_core::llm::{
        ChatChunk, ChatMessage, ChatResponse, ChatStream, Choice, ChunkChoice, ChunkDelta,
    };
    use async_trait::async_trait;

    struct MockProvider {
        reply: String,
        stream_tokens: Vec<String>,
        fail_after: Option<usize>,
    }

    impl MockProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                stream_tokens: reply.split_inclusive(' ').map(String::from).collect(),
                fail_after: None,
            }
        }

        fn failing_after(mut self, tokens: usize) -> Self {
            self.fail_after = Some(tokens);
            self
        }

        fn token_chunk(content: &str) -> ChatChunk {
            ChatChunk {
                id: "c".into(),
                model: "mock".into(),
                choices: vec![ChunkChoice {
                    index: 0,
                    delta: ChunkDelta {
                        role: None,
                        content: Some(content.to_string()),
                    },
                    finish_reason: None,
                }],
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }

        async fn chat(&self, _request: ChatRequest) -> RagResult<ChatResponse> {
            Ok(ChatResponse {
                id: "r".into(),
                model: "mock-model".into(),
                choices: vec![Choice {
                    index: 0,
                    message: ChatMessage::assistant(self.reply.clone()),
                    finish_reason: Some("stop".into()),
                }],
                usage: None,
            })
        }

        async fn chat_stream(&self, _request: ChatRequest) -> RagResult<ChatStream> {
            let mut items: Vec<RagResult<ChatChunk>> = Vec::new();
            for (i, token) in self.stream_tokens.iter().enumerate() {
                if self.fail_after == Some(i) {
                    items.push(Err(RagError::Generation("connection reset".into())));
                    break;
                }
                items.push(Ok(Self::token_chunk(token)));
            }
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn orchestrator(provider: MockProvider) -> RagOrchestrator {
        let settings = RagSettings::default()
            .with_chunking(200, 40)
            .with_top_k(3);
        RagOrchestrator::new(
            settings,
            Arc::new(HashEmbedder::with_defaults()),
            Arc::new(InMemoryVectorIndex::new("test")),
            Arc::new(provider),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_lazy_initialization() {
        let orch = orchestrator(MockProvider::new("hi"));
        assert_eq!(orch.state().await, OrchestratorState::Uninitialized);

        orch.process_query("anything at all").await.unwrap();
        assert_eq!(orch.state().await, OrchestratorState::Ready);
    }

    #[tokio::test]
    async fn test_no_documents_uses_sentinel_context() {
        let orch = orchestrator(MockProvider::new("I cannot answer that."));

        let answer = orch.process_query("anything at all").await.unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(answer.context, NO_DOCUMENTS_MESSAGE);
        // The LLM is still consulted, grounded on the sentinel.
        assert_eq!(answer.response_text, "I cannot answer that.");
        assert_eq!(answer.metadata.documents_retrieved, 0);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let orch = orchestrator(MockProvider::new("hi"));
        assert!(matches!(
            orch.process_query("   ").await,
            Err(RagError::Query(_))
        ));
    }

    #[tokio::test]
    async fn test_query_with_documents() {
        let orch = orchestrator(MockProvider::new("The cat sat on the mat."));
        orch.chunk_and_ingest(
            "Cats like to sit on mats. Dogs prefer to run outside.",
            "pets.txt",
            SourceType::Text,
        )
        .await
        .unwrap();

        let answer = orch.process_query("Where do cats sit?").await.unwrap();
        assert_eq!(answer.response_text, "The cat sat on the mat.");
        assert!(!answer.sources.is_empty());
        assert!(answer.context.contains("[Source 1]"));
        assert!(answer.context.contains("(file: pets.txt)"));
        assert_eq!(answer.metadata.documents_retrieved, answer.sources.len());
    }

    #[tokio::test]
    async fn test_ingest_reports_partial_batch() {
        let orch = orchestrator(MockProvider::new("hi"));
        orch.initialize().await.unwrap();

        let chunks = vec![
            TextChunk::from_draft(
                ragweave_core::rag::ChunkDraft {
                    text: "real words".into(),
                    start_index: 0,
                    length: 10,
                    chunk_index: 0,
                },
                "doc.txt",
                SourceType::Text,
            ),
            TextChunk::from_draft(
                ragweave_core::rag::ChunkDraft {
                    text: "???".into(),
                    start_index: 10,
                    length: 3,
                    chunk_index: 1,
                },
                "doc.txt",
                SourceType::Text,
            ),
            TextChunk::from_draft(
                ragweave_core::rag::ChunkDraft {
                    text: "more words".into(),
                    start_index: 13,
                    length: 10,
                    chunk_index: 2,
                },
                "doc.txt",
                SourceType::Text,
            ),
        ];

        let report = orch.add_document_to_knowledge_base(chunks).await.unwrap();
        assert_eq!(report.total_chunks, 3);
        assert_eq!(report.chunks_added, 2);
        assert!(report.is_partial());
    }

    #[tokio::test]
    async fn test_streaming_query() {
        let orch = orchestrator(MockProvider::new("Cats sit on mats."));
        orch.chunk_and_ingest(
            "Cats like to sit on mats all day long.",
            "pets.txt",
            SourceType::Text,
        )
        .await
        .unwrap();

        let (sources, mut stream) = orch
            .process_query_streaming("Where do cats sit?")
            .await
            .unwrap();
        assert!(!sources.is_empty());

        let mut text = String::new();
        let mut done = false;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                AnswerEvent::Token(t) => text.push_str(&t),
                AnswerEvent::Done { metadata } => {
                    done = true;
                    assert_eq!(metadata.documents_retrieved, sources.len());
                }
            }
        }
        assert!(done);
        assert_eq!(text, "Cats sit on mats.");
    }

    #[tokio::test]
    async fn test_streaming_error_after_partial_tokens() {
        let orch = orchestrator(MockProvider::new("one two three four").failing_after(2));
        orch.chunk_and_ingest(
            "Counting practice goes one two three four five.",
            "count.txt",
            SourceType::Text,
        )
        .await
        .unwrap();

        let (_, mut stream) = orch.process_query_streaming("count for me").await.unwrap();

        let mut tokens = Vec::new();
        let mut saw_error = false;
        while let Some(event) = stream.next().await {
            match event {
                Ok(AnswerEvent::Token(t)) => tokens.push(t),
                Ok(AnswerEvent::Done { .. }) => panic!("stream should fail before Done"),
                Err(e) => {
                    saw_error = true;
                    assert!(matches!(e, RagError::Generation(_)));
                    break;
                }
            }
        }
        assert!(saw_error);
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_streaming_without_documents_still_generates() {
        let orch = orchestrator(MockProvider::new("Nothing stored yet."));
        let (sources, mut stream) = orch.process_query_streaming("anything").await.unwrap();
        assert!(sources.is_empty());

        let mut text = String::new();
        let mut done = false;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                AnswerEvent::Token(t) => text.push_str(&t),
                AnswerEvent::Done { metadata } => {
                    done = true;
                    assert_eq!(metadata.documents_retrieved, 0);
                }
            }
        }
        assert!(done);
        assert_eq!(text, "Nothing stored yet.");
    }

    #[tokio::test]
    async fn test_per_call_top_k_overrides_default() {
        let orch = orchestrator(MockProvider::new("ok"));
        orch.chunk_and_ingest("Cats sit on mats.", "cats.txt", SourceType::Text)
            .await
            .unwrap();
        orch.chunk_and_ingest("Dogs run in parks.", "dogs.txt", SourceType::Text)
            .await
            .unwrap();

        let narrow = orch
            .process_query_with_top_k("Where do cats sit?", 1)
            .await
            .unwrap();
        assert_eq!(narrow.sources.len(), 1);

        // The configured default (3) sees both documents.
        let wide = orch.process_query("Where do cats sit?").await.unwrap();
        assert_eq!(wide.sources.len(), 2);

        assert!(matches!(
            orch.process_query_with_top_k("Where do cats sit?", 0).await,
            Err(RagError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_knowledge_base() {
        let orch = orchestrator(MockProvider::new("hi"));
        orch.chunk_and_ingest("Some document text here.", "a.txt", SourceType::Text)
            .await
            .unwrap();
        assert!(orch.knowledge_base_info().await.unwrap().count > 0);

        orch.clear_knowledge_base().await.unwrap();
        assert_eq!(orch.knowledge_base_info().await.unwrap().count, 0);
    }
}
