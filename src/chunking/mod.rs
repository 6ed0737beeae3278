//! Content chunking for breaking flattened sources into retrievable units.
//!
//! Chunks are fixed-size character windows with a fixed overlap. Each chunk records its
//! character span and the source position resolved at its first character.

mod window;

pub use window::WindowChunker;

use crate::error::{Result, SitatError};
use crate::source::SourcePosition;
use serde::{Deserialize, Serialize};

/// A chunk of content from a flattened source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id, `{source_id}_chunk_{index:04}`.
    pub id: String,
    /// Collection this chunk belongs to.
    pub source_id: String,
    /// Text content of this chunk.
    pub text: String,
    /// First character (inclusive) in the flattened text.
    pub char_start: usize,
    /// Last character (exclusive) in the flattened text.
    pub char_end: usize,
    /// Source position resolved at `char_start`.
    pub source_position: SourcePosition,
    /// Order of this chunk in the source.
    pub chunk_index: usize,
}

impl Chunk {
    /// Build the id for chunk `index` of `source_id`.
    pub fn make_id(source_id: &str, index: usize) -> String {
        format!("{}_chunk_{:04}", source_id, index)
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// A final chunk shorter than this is merged into the previous one.
    pub min_tail_chars: usize,
}

impl ChunkingConfig {
    /// Config with `min_tail_chars` equal to the overlap.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_tail_chars: chunk_overlap,
        }
    }

    pub fn with_min_tail(mut self, min_tail_chars: usize) -> Self {
        self.min_tail_chars = min_tail_chars;
        self
    }

    /// Reject sizings under which the window could never advance.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SitatError::Config(
                "chunk_size_chars must be a positive integer".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(SitatError::Config(format!(
                "chunk_overlap_chars ({}) must be smaller than chunk_size_chars ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.min_tail_chars > self.chunk_size {
            return Err(SitatError::Config(format!(
                "min_tail_chars ({}) must not exceed chunk_size_chars ({})",
                self.min_tail_chars, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::new(800, 200)
    }
}

/// Find the chunk covering character `position`.
///
/// Spans are treated as closed, and the earliest match wins: a position inside an
/// overlap, or on a boundary shared by two chunks, belongs to the earlier chunk.
pub fn locate(chunks: &[Chunk], position: usize) -> Option<&Chunk> {
    chunks
        .iter()
        .find(|c| c.char_start <= position && position <= c.char_end)
}
