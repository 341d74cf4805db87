//! Sentence-aware text chunker
//!
//! Splits documents into overlapping windows of at most `chunk_size`
//! characters, preferring to cut just after sentence-ending punctuation
//! near the end of each window. All offsets are character offsets, so
//! multi-byte text chunks the same way as ASCII.

use ragweave_core::rag::{ChunkDraft, SourceType, TextChunk};
use ragweave_core::{RagError, RagResult};
use tracing::debug;

/// Characters that end a sentence for cut-point purposes.
const SENTENCE_ENDINGS: [char; 4] = ['.', '?', '!', '\n'];

/// Chunking parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters of overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Windowed chunker with sentence-boundary preference.
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    /// Create a chunker, rejecting configurations that cannot make
    /// progress (`chunk_overlap >= chunk_size` or a zero window).
    pub fn new(config: ChunkerConfig) -> RagResult<Self> {
        if config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be positive".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }

    /// Split text into chunk drafts.
    ///
    /// Each window of up to `chunk_size` characters is scanned backwards
    /// through its trailing 30% for the rightmost sentence ending; the cut
    /// lands just after it. The character immediately past the window also
    /// counts as a cut candidate, so a sentence ending exactly at the
    /// window edge is kept whole. When no sentence ending is found the
    /// window is cut hard at `chunk_size`. The next window starts
    /// `chunk_overlap` characters before the cut.
    ///
    /// Chunks are trimmed of surrounding whitespace; windows that trim to
    /// nothing are skipped, so `chunk_index` values stay contiguous over
    /// the emitted chunks. Empty input is an error.
    pub fn chunk(&self, text: &str) -> RagResult<Vec<ChunkDraft>> {
        if text.is_empty() {
            return Err(RagError::EmptyInput("cannot chunk empty text".into()));
        }

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let region_len = (self.config.chunk_size * 3 / 10).max(1);

        let mut drafts = Vec::new();
        let mut cursor = 0usize;
        let mut chunk_index = 0usize;

        while cursor < total {
            let end = (cursor + self.config.chunk_size).min(total);
            let mut cut = end;

            if end < total {
                let search_from = end.saturating_sub(region_len).max(cursor);
                let mut p = end.min(total - 1);
                loop {
                    if SENTENCE_ENDINGS.contains(&chars[p]) {
                        cut = p + 1;
                        break;
                    }
                    if p == search_from {
                        break;
                    }
                    p -= 1;
                }
            }

            let raw: String = chars[cursor..cut].iter().collect();
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                let leading_ws = raw.chars().take_while(|c| c.is_whitespace()).count();
                drafts.push(ChunkDraft {
                    text: trimmed.to_string(),
                    start_index: cursor + leading_ws,
                    length: trimmed.chars().count(),
                    chunk_index,
                });
                chunk_index += 1;
            }

            if cut >= total {
                break;
            }

            let next = cut.saturating_sub(self.config.chunk_overlap);
            // Overlap never rewinds past the previous cursor.
            cursor = if next > cursor { next } else { cut };
        }

        debug!(
            chunks = drafts.len(),
            chars = total,
            "chunked text into drafts"
        );
        Ok(drafts)
    }

    /// Split a document and attach source identity to every chunk.
    pub fn chunk_document(
        &self,
        text: &str,
        source_file: &str,
        source_type: SourceType,
    ) -> RagResult<Vec<TextChunk>> {
        let drafts = self.chunk(text)?;
        Ok(drafts
            .into_iter()
            .map(|d| TextChunk::from_draft(d, source_file, source_type))
            .collect())
    }
}
