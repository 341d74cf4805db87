//! Vector similarity helpers
//!
//! Shared by the in-memory index and tests. Distances are
//! ascending-better throughout the pipeline.

use ragweave_core::{RagError, RagResult};

/// Cosine similarity clamped to `[0, 1]`.
///
/// Fails on empty inputs or mismatched dimensions. Zero-magnitude
/// vectors compare as 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> RagResult<f32> {
    if a.is_empty() || b.is_empty() {
        return Err(RagError::EmptyInput(
            "cannot compare empty vectors".into(),
        ));
    }
    if a.len() != b.len() {
        return Err(RagError::dimension_mismatch(a.len(), b.len()));
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a * norm_b)).clamp(0.0, 1.0))
}

/// Cosine distance: `1 - cosine_similarity`, so lower means closer.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> RagResult<f32> {
    Ok(1.0 - cosine_similarity(a, b)?)
}
