//! Fixed-size sliding-window chunking.

use super::{Chunk, ChunkingConfig};
use crate::error::Result;
use crate::mapping::Flattened;
use tracing::debug;

/// Sliding-window chunker over flattened text.
///
/// Chunk `i+1` starts `chunk_overlap` characters before chunk `i` ends. The output is
/// a pure function of the input text and config.
#[derive(Debug, Clone)]
pub struct WindowChunker {
    config: ChunkingConfig,
}

impl WindowChunker {
    /// Create a chunker, rejecting invalid sizing up front.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Compute `[start, end)` character spans for a text of `len` characters.
    pub fn spans(&self, len: usize) -> Vec<(usize, usize)> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut spans: Vec<(usize, usize)> = Vec::new();

        if len == 0 {
            return spans;
        }

        let mut start = 0;
        loop {
            let end = (start + size).min(len);
            spans.push((start, end));
            if end == len {
                break;
            }

            // end == start + size here, so this always advances
            let next_start = end - overlap;
            let tail_len = len - next_start;
            if tail_len <= size && tail_len < self.config.min_tail_chars {
                if let Some(last) = spans.last_mut() {
                    last.1 = len;
                }
                break;
            }
            start = next_start;
        }

        spans
    }

    /// Split flattened text into chunks for `source_id`.
    pub fn chunk(&self, source_id: &str, flattened: &Flattened) -> Vec<Chunk> {
        let text = &flattened.text;

        // Byte offset of every character, plus the end of the string
        let byte_offsets: Vec<usize> = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();

        let chunks: Vec<Chunk> = self
            .spans(flattened.char_len())
            .into_iter()
            .filter_map(|(start, end)| {
                let source_position = flattened.resolve(start)?.clone();
                Some((start, end, source_position))
            })
            .enumerate()
            .map(|(index, (start, end, source_position))| Chunk {
                id: Chunk::make_id(source_id, index),
                source_id: source_id.to_string(),
                text: text[byte_offsets[start]..byte_offsets[end]].to_string(),
                char_start: start,
                char_end: end,
                source_position,
                chunk_index: index,
            })
            .collect();

        debug!(
            input_chars = flattened.char_len(),
            chunk_count = chunks.len(),
            chunk_size = self.config.chunk_size,
            "Text chunked"
        );

        chunks
    }
}
