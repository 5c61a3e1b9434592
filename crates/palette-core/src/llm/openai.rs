//! OpenAI chat completions provider
//!
//! Also works against OpenAI-compatible servers via `llm.base_url`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::LlmConfig;
use crate::cost::CostTracker;
use crate::error::{Error, Result};

use super::provider::{LlmProvider, ProviderBuilder, ProviderCore, ProviderKind};
use super::retry::{DEFAULT_RETRY_AFTER_SECS, extract_retry_after, with_rate_limit_retry};
use super::types::{ChatRequest, ChatResponse, LlmResponse, Message};

/// OpenAI provider
///
/// Cheap to clone; clones share the HTTP connection pool and cost tracker.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    core: ProviderCore,
}

impl OpenAiProvider {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        ProviderBuilder::new()
            .config(config)
            .api_key(api_key)
            .build_core()
            .map(Self::from_core)
    }

    pub(crate) fn from_core(core: ProviderCore) -> Self {
        Self { core }
    }

    pub fn with_cost_tracker(mut self, tracker: Arc<CostTracker>) -> Self {
        self.core.cost_tracker = Some(tracker);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.core.base_url
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.core.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .core
            .http_client
            .post(&url)
            .bearer_auth(&self.core.api_key)
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status.as_u16(), retry_after.as_deref(), &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        LlmResponse::from_chat_response(chat_response)
            .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn default_model(&self) -> &str {
        &self.core.config.default_model
    }

    fn fallback_models(&self) -> &[String] {
        &self.core.config.fallback_models
    }

    async fn complete(&self, messages: Vec<Message>, model: Option<&str>) -> Result<LlmResponse> {
        self.core.check_budget()?;

        let request = ChatRequest::new(self.core.model(model), messages)
            .with_temperature(self.core.config.temperature)
            .with_max_tokens(self.core.config.max_tokens);

        let response = with_rate_limit_retry(|| self.send_request(&request)).await?;
        self.core.record_usage(&response);
        Ok(response)
    }
}

fn map_error_status(status: u16, retry_after: Option<&str>, body: &str) -> Error {
    match status {
        401 => Error::LLMError(
            "Unauthorized: Invalid API key. Set PALETTE_API_KEY or OPENAI_API_KEY environment variable."
                .to_string(),
        ),
        429 => Error::RateLimited(
            extract_retry_after(retry_after, body).unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        ),
        400 => Error::LLMError(format!("Bad request: {}", body)),
        403 => Error::LLMError(format!("Forbidden: {}", body)),
        404 => Error::LLMError(format!("Model not found or endpoint unavailable: {}", body)),
        503 => Error::LLMError(format!("Service unavailable: {}", body)),
        500..=599 => Error::LLMError(format!("Server error ({}): {}", status, body)),
        _ => Error::LLMError(format!("HTTP error {}: {}", status, body)),
    }
}
