//! Answer and summary generation over retrieved passages.

use super::{cite, CitedAnswer, PromptAssembler};
use crate::chunking::Chunk;
use crate::completion::{Completer, ModelConfig};
use crate::error::Result;
use crate::vector_store::SourceInfo;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answer returned when retrieval found nothing to show the model.
pub const NO_INFORMATION_ANSWER: &str =
    "I couldn't find any relevant information in this source to answer your question.";

/// Answer returned when a source has no content to summarize.
pub const EMPTY_SOURCE_SUMMARY: &str = "This source has no indexed content to summarize.";

/// RAG engine: prompt, complete, cite.
pub struct RagEngine {
    completer: Arc<dyn Completer>,
    assembler: PromptAssembler,
    model: ModelConfig,
}

impl RagEngine {
    pub fn new(completer: Arc<dyn Completer>, assembler: PromptAssembler, model: ModelConfig) -> Self {
        Self {
            completer,
            assembler,
            model,
        }
    }

    /// Use a different model for subsequent calls.
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Answer `question` from `chunks`, which must already be in prompt order.
    ///
    /// With no chunks the completer is not called and a fixed answer is returned.
    #[instrument(skip(self, source, chunks), fields(source_id = %source.source_id, chunks = chunks.len()))]
    pub async fn answer(
        &self,
        question: &str,
        source: &SourceInfo,
        chunks: &[Chunk],
    ) -> Result<CitedAnswer> {
        if chunks.is_empty() {
            info!("No passages retrieved, skipping completion");
            return Ok(CitedAnswer::uncited(NO_INFORMATION_ANSWER));
        }

        let prompt = self.assembler.question_prompt(question, &source.title, chunks);
        let answer = self.completer.complete(&prompt.request, &self.model).await?;
        let cited = cite(&answer, &prompt.passages, source);

        debug!(
            "Answer cites {} of {} passages",
            cited.citations.len(),
            prompt.passages.len()
        );
        Ok(cited)
    }

    /// Summarize a source from all of its chunks, in order.
    ///
    /// Long sources are sampled evenly down to the prompt cap.
    #[instrument(skip(self, source, chunks), fields(source_id = %source.source_id, chunks = chunks.len()))]
    pub async fn summarize(&self, source: &SourceInfo, chunks: &[Chunk]) -> Result<CitedAnswer> {
        if chunks.is_empty() {
            return Ok(CitedAnswer::uncited(EMPTY_SOURCE_SUMMARY));
        }

        let sampled = sample_evenly(chunks, self.assembler.max_chunks());
        let prompt = self.assembler.summary_prompt(&source.title, &sampled);
        let summary = self.completer.complete(&prompt.request, &self.model).await?;

        Ok(cite(&summary, &prompt.passages, source))
    }
}

/// Pick `n` items spread evenly over `items`, keeping the first and last.
pub fn sample_evenly<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    if items.len() <= n {
        return items.to_vec();
    }
    match n {
        0 => Vec::new(),
        1 => vec![items[0].clone()],
        _ => (0..n)
            .map(|i| items[i * (items.len() - 1) / (n - 1)].clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionRequest;
    use crate::config::Prompts;
    use crate::error::SitatError;
    use crate::source::{SourceKind, SourcePosition};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed answer and records every request.
    struct ScriptedCompleter {
        reply: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompleter {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Completer for ScriptedCompleter {
        async fn complete(&self, request: &CompletionRequest, _model: &ModelConfig) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    struct FailingCompleter;

    #[async_trait]
    impl Completer for FailingCompleter {
        async fn complete(&self, _request: &CompletionRequest, _model: &ModelConfig) -> Result<String> {
            Err(SitatError::Completion("rate limited".to_string()))
        }
    }

    fn source() -> SourceInfo {
        SourceInfo {
            source_id: "dQw4w9WgXcQ".to_string(),
            title: "Talk".to_string(),
            kind: SourceKind::Transcript,
            origin: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                id: Chunk::make_id("dQw4w9WgXcQ", i),
                source_id: "dQw4w9WgXcQ".to_string(),
                text: format!("passage {}", i),
                char_start: i * 10,
                char_end: i * 10 + 9,
                source_position: SourcePosition::timestamp(i as f64 * 30.0),
                chunk_index: i,
            })
            .collect()
    }

    fn engine(completer: Arc<dyn Completer>, max_chunks: usize) -> RagEngine {
        RagEngine::new(
            completer,
            PromptAssembler::new(Prompts::default(), max_chunks),
            ModelConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_no_passages_skips_completer() {
        let completer = Arc::new(ScriptedCompleter::new("should not be used"));
        let rag = engine(completer.clone(), 8);

        let answer = rag.answer("anything?", &source(), &[]).await.unwrap();
        assert_eq!(answer.answer_text, NO_INFORMATION_ANSWER);
        assert!(answer.citations.is_empty());
        assert_eq!(completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_answer_is_cited() {
        let completer = Arc::new(ScriptedCompleter::new("It starts at [2], see also [5]."));
        let rag = engine(completer.clone(), 8);

        let answer = rag.answer("when?", &source(), &chunks(3)).await.unwrap();
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].chunk_id, "dQw4w9WgXcQ_chunk_0001");
        assert_eq!(answer.citations[0].source_reference.label, "00:30");
        assert_eq!(completer.calls(), 1);
    }

    #[tokio::test]
    async fn test_completion_errors_propagate() {
        let rag = engine(Arc::new(FailingCompleter), 8);
        let err = rag.answer("q", &source(), &chunks(2)).await.unwrap_err();
        assert!(matches!(err, SitatError::Completion(_)));
    }

    #[tokio::test]
    async fn test_summarize_samples_evenly() {
        let completer = Arc::new(ScriptedCompleter::new("Overview [1] and ending [4]."));
        let rag = engine(completer.clone(), 4);

        let summary = rag.summarize(&source(), &chunks(10)).await.unwrap();
        let cited: Vec<&str> = summary.citations.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(cited, vec!["dQw4w9WgXcQ_chunk_0000", "dQw4w9WgXcQ_chunk_0009"]);

        let request = completer.requests.lock().unwrap()[0].clone();
        assert!(request.user.contains("passage 3"));
        assert!(!request.user.contains("passage 4"));
    }

    #[test]
    fn test_sample_evenly() {
        let items: Vec<usize> = (0..10).collect();
        assert_eq!(sample_evenly(&items, 4), vec![0, 3, 6, 9]);
        assert_eq!(sample_evenly(&items, 1), vec![0]);
        assert_eq!(sample_evenly(&items, 20), items);
        assert!(sample_evenly(&items, 0).is_empty());
    }
}
