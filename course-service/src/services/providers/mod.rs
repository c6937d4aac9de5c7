//! Generation and embedding provider abstractions.
//!
//! Handlers depend on these traits only, so the OpenAI client can be swapped
//! for a mock in tests.

pub mod mock;
pub mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authentication rejected by provider")]
    Unauthorized,

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::NetworkError(err.to_string())
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        tracing::warn!(error = %err, "Generation service call failed");
        match err {
            ProviderError::Timeout => {
                AppError::ServiceUnavailable("Generation service timed out".to_string())
            }
            ProviderError::RateLimited => {
                AppError::ServiceUnavailable("Generation service is rate limited".to_string())
            }
            ProviderError::NotConfigured(_) => {
                AppError::ServiceUnavailable("Generation service is not configured".to_string())
            }
            ProviderError::ApiError(_)
            | ProviderError::Unauthorized
            | ProviderError::NetworkError(_)
            | ProviderError::InvalidResponse(_) => {
                AppError::BadGateway("Generation service request failed".to_string())
            }
        }
    }
}

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Generation parameters for completion requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<u32>,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    /// Output withheld by the provider's safety filter; `text` is `None`.
    ContentFilter,
    Other,
}

/// Result of a completion call. `text` is untrusted free-form output.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
}

/// Trait for chat completion providers (e.g., OpenAI).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Model name, for logs and metrics.
    fn model(&self) -> &str;

    /// One completion for the given conversation.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Trait for text embedding providers, used by semantic search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. Implementations check the vector length.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}
