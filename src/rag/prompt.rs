//! Prompt assembly from numbered passages.

use super::Passage;
use crate::chunking::Chunk;
use crate::completion::CompletionRequest;
use crate::config::Prompts;
use std::collections::HashMap;

/// A prompt together with the passages its markers refer to.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub request: CompletionRequest,
    pub passages: Vec<Passage>,
}

/// Builds prompts that embed passages behind `[1]`, `[2]`, ... markers.
///
/// Output depends only on the inputs: the same question and chunks always give a
/// byte-identical prompt.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    prompts: Prompts,
    max_chunks: usize,
}

impl PromptAssembler {
    pub fn new(prompts: Prompts, max_chunks: usize) -> Self {
        Self { prompts, max_chunks }
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Number the first `max_chunks` chunks, in input order.
    pub fn passages(&self, chunks: &[Chunk]) -> Vec<Passage> {
        chunks
            .iter()
            .take(self.max_chunks)
            .enumerate()
            .map(|(i, chunk)| Passage {
                marker: i + 1,
                chunk: chunk.clone(),
            })
            .collect()
    }

    /// Prompt for answering `question` from `chunks`.
    pub fn question_prompt(&self, question: &str, title: &str, chunks: &[Chunk]) -> AssembledPrompt {
        let passages = self.passages(chunks);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("title".to_string(), title.to_string());
        vars.insert("passages".to_string(), format_passages(&passages));

        AssembledPrompt {
            request: CompletionRequest {
                system: self.prompts.render_with_custom(&self.prompts.rag.system, &vars),
                user: self.prompts.render_with_custom(&self.prompts.rag.user, &vars),
            },
            passages,
        }
    }

    /// Prompt for summarizing a source from `chunks`.
    pub fn summary_prompt(&self, title: &str, chunks: &[Chunk]) -> AssembledPrompt {
        let passages = self.passages(chunks);

        let mut vars = HashMap::new();
        vars.insert("title".to_string(), title.to_string());
        vars.insert("passages".to_string(), format_passages(&passages));

        AssembledPrompt {
            request: CompletionRequest {
                system: self.prompts.render_with_custom(&self.prompts.summary.system, &vars),
                user: self.prompts.render_with_custom(&self.prompts.summary.user, &vars),
            },
            passages,
        }
    }
}

/// Format passages for a prompt.
pub fn format_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| {
            format!(
                "[{}] ({})\n{}",
                p.marker,
                p.chunk.source_position.label(),
                p.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourcePosition;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                id: Chunk::make_id("v", i),
                source_id: "v".to_string(),
                text: format!("passage text {}", i),
                char_start: i * 20,
                char_end: i * 20 + 14,
                source_position: SourcePosition::timestamp(i as f64 * 60.0),
                chunk_index: i,
            })
            .collect()
    }

    #[test]
    fn test_markers_follow_input_order_and_cap() {
        let assembler = PromptAssembler::new(Prompts::default(), 3);
        let mut input = chunks(5);
        input.reverse();

        let prompt = assembler.question_prompt("why?", "Talk", &input);
        assert_eq!(prompt.passages.len(), 3);
        assert_eq!(prompt.passages[0].marker, 1);
        assert_eq!(prompt.passages[0].chunk.chunk_index, 4);

        assert!(prompt.request.user.contains("[1] (04:00)\npassage text 4"));
        assert!(prompt.request.user.contains("[3] (02:00)\npassage text 2"));
        assert!(!prompt.request.user.contains("passage text 1"));
        assert!(prompt.request.user.contains("Question: why?"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let assembler = PromptAssembler::new(Prompts::default(), 8);
        let a = assembler.question_prompt("q", "t", &chunks(4));
        let b = assembler.question_prompt("q", "t", &chunks(4));
        assert_eq!(a.request, b.request);
    }

    #[test]
    fn test_passage_text_is_not_rendered_as_template() {
        let assembler = PromptAssembler::new(Prompts::default(), 8);
        let mut input = chunks(1);
        input[0].text = "literal {{question}} in the source".to_string();

        let prompt = assembler.question_prompt("real question", "t", &input);
        assert!(prompt.request.user.contains("literal {{question}} in the source"));
    }

    #[test]
    fn test_summary_prompt() {
        let assembler = PromptAssembler::new(Prompts::default(), 8);
        let prompt = assembler.summary_prompt("My Talk", &chunks(2));
        assert!(prompt.request.user.contains("\"My Talk\""));
        assert!(prompt.request.user.contains("[2] (01:00)"));
    }
}
