//! Minimal end-to-end demo: ingest a document, then answer a question
//! against it with a local OpenAI-compatible server (e.g. Ollama).
//!
//! ```bash
//! cargo run --example rag_demo
//! ```

use ragweave_core::rag::SourceType;
use ragweave_engine::llm::openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
use ragweave_engine::rag::embedder::HashEmbedder;
use ragweave_engine::rag::memory_index::InMemoryVectorIndex;
use ragweave_engine::rag::orchestrator::RagOrchestrator;
use ragweave_engine::RagSettings;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = RagSettings::from_env();
    let provider = OpenAiCompatProvider::new(OpenAiCompatConfig::from_settings(&settings))?;

    let orchestrator = RagOrchestrator::new(
        settings,
        Arc::new(HashEmbedder::with_defaults()),
        Arc::new(InMemoryVectorIndex::new("demo")),
        Arc::new(provider),
    )?;

    let document = "The Rust compiler enforces memory safety through ownership. \
                    Every value has a single owner, and borrows are checked at \
                    compile time. When the owner goes out of scope the value is \
                    dropped, so there is no garbage collector.";

    let report = orchestrator
        .chunk_and_ingest(document, "ownership.md", SourceType::Markdown)
        .await?;
    println!(
        "ingested {}/{} chunks",
        report.chunks_added, report.total_chunks
    );

    let answer = orchestrator
        .process_query("How does Rust manage memory without a garbage collector?")
        .await?;

    println!("\nanswer:\n{}", answer.response_text);
    println!("\nsources:");
    for (i, source) in answer.sources.iter().enumerate() {
        println!(
            "  [{}] {}% relevant: {}",
            i + 1,
            source.relevance_percent(),
            source.metadata.get("source_file").map_or("?", |s| s)
        );
    }
    Ok(())
}
