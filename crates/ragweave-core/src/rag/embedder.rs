//! Embedder trait definition
//!
//! Deterministic text-to-vector mapping. The bundled implementation in
//! `ragweave-engine` is a hand-built feature embedder; a model-backed
//! embedder can implement this trait without changing any caller.

use crate::error::RagResult;

/// Abstract interface for turning text into fixed-dimension vectors.
///
/// Every vector produced by one embedder has the same dimension
/// [`Embedder::dim`] and is L2-normalized (magnitude 1.0 within floating
/// tolerance). Identical input text must produce bit-identical vectors.
pub trait Embedder: Send + Sync {
    /// Vector dimension D. Fixed per embedder configuration.
    fn dim(&self) -> usize;

    /// Embed a single text.
    ///
    /// Fails with `RagError::EmptyInput` on empty or whitespace-only text.
    fn embed(&self, text: &str) -> RagResult<Vec<f32>>;

    /// Embed a batch, marking per-item failures as `None` instead of
    /// failing the whole batch.
    fn embed_batch(&self, texts: &[String]) -> RagResult<Vec<Option<Vec<f32>>>> {
        Ok(texts.iter().map(|t| self.embed(t).ok()).collect())
    }
}
