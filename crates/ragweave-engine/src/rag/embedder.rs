//! Deterministic feature embedder
//!
//! Produces stable, dependency-free embeddings from lexical statistics:
//! letter frequencies, text-shape features and stopword frequencies,
//! padded to the configured dimension with hash-seeded sine values and
//! L2-normalized. Identical input always yields an identical vector, so
//! retrieval ranking is reproducible across runs and test environments.
//!
//! This is a lightweight stand-in for a neural encoder; swapping in a
//! real model only requires another [`Embedder`] implementation.

use ragweave_core::rag::Embedder;
use ragweave_core::{RagError, RagResult};

/// Named feature dimensions: 26 letter frequencies, 3 shape features
/// and 12 stopword frequencies. Anything above is sine filler.
pub const MIN_EMBEDDING_DIM: usize = 26 + 3 + 12;

const STOPWORDS: [&str; 12] = [
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "to", "of", "in",
];

/// Hash-seeded lexical embedder with a configurable dimension.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    /// Create an embedder of the given dimension.
    ///
    /// Dimensions below [`MIN_EMBEDDING_DIM`] cannot hold the named
    /// features and are rejected.
    pub fn new(dim: usize) -> RagResult<Self> {
        if dim < MIN_EMBEDDING_DIM {
            return Err(RagError::Config(format!(
                "embedding dimension {dim} is below the minimum of {MIN_EMBEDDING_DIM}"
            )));
        }
        Ok(Self { dim })
    }

    /// 384-dimensional embedder, the pipeline default.
    pub fn with_defaults() -> Self {
        Self { dim: 384 }
    }

    /// Lowercase and strip everything that is not alphanumeric or space.
    fn normalize(text: &str) -> String {
        text.to_lowercase()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c
                } else {
                    ' '
                }
            })
            .collect()
    }

    fn fnv1a(text: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        let normalized = Self::normalize(text);
        if normalized.trim().is_empty() {
            return Err(RagError::EmptyInput(
                "cannot embed empty or non-alphanumeric text".into(),
            ));
        }

        let mut vector = vec![0.0f32; self.dim];
        let char_count = normalized.chars().count() as f32;
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let word_count = words.len() as f32;

        // Dims 0..26: letter frequencies.
        for c in normalized.chars() {
            if c.is_ascii_lowercase() {
                vector[(c as usize) - ('a' as usize)] += 1.0 / char_count;
            }
        }

        // Dims 26..29: text shape, each capped at 1.0.
        vector[26] = (char_count / 1000.0).min(1.0);
        vector[27] = (word_count / 100.0).min(1.0);
        let sentence_count = text.chars().filter(|c| matches!(c, '.' | '?' | '!')).count() as f32;
        vector[28] = (sentence_count / 10.0).min(1.0);

        // Dims 29..41: stopword frequencies.
        for (i, stopword) in STOPWORDS.iter().enumerate() {
            let hits = words.iter().filter(|w| *w == stopword).count() as f32;
            vector[29 + i] = hits / word_count;
        }

        // Remaining dims: hash-seeded sine filler so short texts still
        // spread across the full space.
        let seed = (Self::fnv1a(&normalized) % 100_000) as f32 / 100_000.0;
        for (i, slot) in vector.iter_mut().enumerate().skip(MIN_EMBEDDING_DIM) {
            *slot = (seed * (i as f32 + 1.0)).sin() * 0.1;
        }

        // L2 normalize.
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }
}
