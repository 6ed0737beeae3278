//! RAG (Retrieval-Augmented Generation) for question answering with citations.
//!
//! Retrieved chunks are numbered into passages, sent to the model, and the markers in
//! the reply are resolved back into citations with timestamps or document lines.

mod citation;
mod engine;
mod prompt;

pub use citation::{
    cite, deep_link, extract_markers, source_reference, Citation, CitedAnswer, SourceReference,
};
pub use engine::{sample_evenly, RagEngine, EMPTY_SOURCE_SUMMARY, NO_INFORMATION_ANSWER};
pub use prompt::{format_passages, AssembledPrompt, PromptAssembler};

use crate::chunking::Chunk;
use serde::{Deserialize, Serialize};

/// A chunk shown to the model behind a `[marker]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// 1-based marker number.
    pub marker: usize,
    pub chunk: Chunk,
}
