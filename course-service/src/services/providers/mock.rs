//! Mock provider implementations for testing.

use super::{
    ChatMessage, EmbeddingProvider, FinishReason, GenerationParams, ProviderError,
    ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock text provider replying with a fixed completion (or failing).
pub struct MockTextProvider {
    reply: Result<String, MockFailure>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

/// Failure modes the mock can simulate.
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Timeout,
    RateLimited,
    Network,
}

impl MockTextProvider {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: MockFailure) -> Self {
        Self {
            reply: Err(failure),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Conversations received so far.
    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut guard) = self.prompts.lock() {
            guard.push(messages.to_vec());
        }

        match &self.reply {
            Ok(text) => Ok(ProviderResponse {
                text: Some(text.clone()),
                input_tokens: messages.iter().map(|m| m.content.len() as u32 / 4).sum(),
                output_tokens: text.len() as u32 / 4,
                finish_reason: FinishReason::Complete,
            }),
            Err(MockFailure::Timeout) => Err(ProviderError::Timeout),
            Err(MockFailure::RateLimited) => Err(ProviderError::RateLimited),
            Err(MockFailure::Network) => Err(ProviderError::NetworkError(
                "connection reset".to_string(),
            )),
        }
    }
}

/// Mock embedding provider returning a constant vector.
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse("empty input".to_string()));
        }
        Ok(vec![0.1; self.dims])
    }
}
