//! Ragweave core contracts
//!
//! Defines the data model, error taxonomy and trait seams shared by every
//! pipeline component. Concrete implementations (chunker, embedders,
//! vector index clients, LLM providers, orchestrators) live in
//! `ragweave-engine`.

pub mod error;
pub mod llm;
pub mod rag;
pub mod task;

pub use error::{RagError, RagResult};
