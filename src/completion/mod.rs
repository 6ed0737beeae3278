//! Chat completion for answer generation.

mod openai;

pub use openai::OpenAICompleter;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A prompt ready to send to a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// Model selection for a completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new("gpt-4o-mini", 0.2)
    }
}

/// Trait for text completion backends.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Generate a reply to `request` with the given model.
    async fn complete(&self, request: &CompletionRequest, model: &ModelConfig) -> Result<String>;
}
