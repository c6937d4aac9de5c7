//! OpenAI provider implementation.
//!
//! Chat Completions for recommendations and the embeddings endpoint for
//! semantic search. Both calls share one client with a bounded timeout.

use super::{
    ChatMessage, EmbeddingProvider, FinishReason, GenerationParams, ProviderError,
    ProviderResponse, TextProvider,
};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// OpenAI text and embedding provider.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(5)))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    /// Turn a non-success status into the matching error.
    async fn check_status(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(ProviderError::Unauthorized),
            429 => Err(ProviderError::RateLimited),
            _ => Err(ProviderError::ApiError(format!(
                "OpenAI API error {}: {}",
                status, error_text
            ))),
        }
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.config.chat_model
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.config.chat_model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        tracing::debug!(
            model = %self.config.chat_model,
            message_count = messages.len(),
            prompt_len = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "Sending request to OpenAI chat completions"
        );

        let start = Instant::now();
        let result = async {
            let response = self
                .client
                .post(self.api_url("chat/completions"))
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .await?;
            let response = Self::check_status(response).await?;
            let body: ChatCompletionResponse = response.json().await?;
            Ok::<_, ProviderError>(body)
        }
        .await;

        histogram!("genai_provider_latency_seconds", "model" => self.config.chat_model.clone())
            .record(start.elapsed().as_secs_f64());

        let api_response = match result {
            Ok(body) => body,
            Err(e) => {
                counter!("genai_requests_total", "model" => self.config.chat_model.clone(), "outcome" => "error")
                    .increment(1);
                return Err(e);
            }
        };

        let choice = api_response.choices.into_iter().next();
        let finish_reason = match choice.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            Some("stop") | None => FinishReason::Complete,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(_) => FinishReason::Other,
        };

        let outcome = if finish_reason == FinishReason::ContentFilter {
            tracing::warn!(model = %self.config.chat_model, "Completion withheld by content filter");
            "filtered"
        } else {
            "ok"
        };
        counter!("genai_requests_total", "model" => self.config.chat_model.clone(), "outcome" => outcome)
            .increment(1);

        // Filtered output is not passed on, even when partial text came back.
        let text = match finish_reason {
            FinishReason::ContentFilter => None,
            _ => choice.and_then(|c| c.message.content),
        };

        let usage = api_response.usage.unwrap_or_default();
        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: [text],
        };

        let start = Instant::now();
        let result = async {
            let response = self
                .client
                .post(self.api_url("embeddings"))
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .await?;
            let response = Self::check_status(response).await?;
            let body: EmbeddingResponse = response.json().await?;

            let embedding = body
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| ProviderError::InvalidResponse("no embedding returned".to_string()))?;

            if embedding.len() != self.config.embedding_dim {
                return Err(ProviderError::InvalidResponse(format!(
                    "embedding dim {} != expected {}",
                    embedding.len(),
                    self.config.embedding_dim
                )));
            }
            Ok::<_, ProviderError>(embedding)
        }
        .await;

        histogram!("genai_provider_latency_seconds", "model" => self.config.embedding_model.clone())
            .record(start.elapsed().as_secs_f64());

        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!("genai_requests_total", "model" => self.config.embedding_model.clone(), "outcome" => outcome)
            .increment(1);

        result
    }
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
