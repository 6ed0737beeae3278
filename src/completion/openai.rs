//! OpenAI chat completions implementation.

use super::{Completer, CompletionRequest, ModelConfig};
use crate::error::{Result, SitatError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based completer.
pub struct OpenAICompleter {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenAICompleter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_client()?,
        })
    }
}

#[async_trait]
impl Completer for OpenAICompleter {
    #[instrument(skip(self, request), fields(model = %model.model))]
    async fn complete(&self, request: &CompletionRequest, model: &ModelConfig) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| SitatError::Completion(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| SitatError::Completion(e.to_string()))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&model.model)
            .messages(messages)
            .temperature(model.temperature)
            .build()
            .map_err(|e| SitatError::Completion(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| SitatError::Completion(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| SitatError::Completion("Empty response from LLM".to_string()))?
            .clone();

        debug!("Completion returned {} chars", answer.len());
        Ok(answer)
    }
}
