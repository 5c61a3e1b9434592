//! Anthropic Messages API provider

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::cost::CostTracker;
use crate::error::{Error, Result};

use super::provider::{LlmProvider, ProviderBuilder, ProviderCore, ProviderKind};
use super::retry::{DEFAULT_RETRY_AFTER_SECS, extract_retry_after, with_rate_limit_retry};
use super::types::{FinishReason, LlmResponse, Message, MessageRole};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: usize,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    fn into_llm_response(self) -> LlmResponse {
        let content = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let (input_tokens, output_tokens) = self
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        let finish_reason = match self.stop_reason.as_deref() {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            Some("tool_use") => FinishReason::ToolCalls,
            _ => FinishReason::Unknown,
        };

        LlmResponse {
            content,
            model: self.model,
            tokens_used: input_tokens + output_tokens,
            input_tokens,
            output_tokens,
            finish_reason,
        }
    }
}

/// Split system messages out; Anthropic takes them as a top-level field
fn split_system(messages: Vec<Message>) -> (Option<String>, Vec<Message>) {
    let (system, rest): (Vec<Message>, Vec<Message>) = messages
        .into_iter()
        .partition(|m| m.role == MessageRole::System);

    let system = if system.is_empty() {
        None
    } else {
        Some(
            system
                .into_iter()
                .map(|m| m.content)
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    };

    (system, rest)
}

/// Anthropic provider
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    core: ProviderCore,
}

impl AnthropicProvider {
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

    async fn send_request(&self, request: &MessagesRequest) -> Result<LlmResponse> {
        let url = format!("{}/messages", self.core.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            has_system = request.system.is_some(),
            "Sending messages request"
        );

        let response = self
            .core
            .http_client
            .post(&url)
            .header("x-api-key", &self.core.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        let llm_response = parsed.into_llm_response();
        if llm_response.content.is_empty() {
            return Err(Error::LLMError("Empty response from API".to_string()));
        }
        Ok(llm_response)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.core.config.default_model
    }

    fn fallback_models(&self) -> &[String] {
        &self.core.config.fallback_models
    }

    async fn complete(&self, messages: Vec<Message>, model: Option<&str>) -> Result<LlmResponse> {
        self.core.check_budget()?;

        let (system, messages) = split_system(messages);
        if messages.is_empty() {
            return Err(Error::InvalidInput(
                "At least one non-system message is required".to_string(),
            ));
        }

        let request = MessagesRequest {
            model: self.core.model(model).to_string(),
            max_tokens: self.core.config.max_tokens,
            messages,
            system,
            // Anthropic accepts 0.0 to 1.0
            temperature: self.core.config.temperature.min(1.0),
        };

        let response = with_rate_limit_retry(|| self.send_request(&request)).await?;
        self.core.record_usage(&response);
        Ok(response)
    }
}

fn map_error_status(status: u16, retry_after: Option<&str>, body: &str) -> Error {
    match status {
        401 => Error::LLMError(
            "Unauthorized: Invalid API key. Set PALETTE_API_KEY or ANTHROPIC_API_KEY environment variable."
                .to_string(),
        ),
        429 => Error::RateLimited(
            extract_retry_after(retry_after, body).unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        ),
        529 => Error::LLMError("Anthropic API is temporarily overloaded".to_string()),
        400 => Error::LLMError(format!("Bad request: {}", body)),
        403 => Error::LLMError(format!("Forbidden: {}", body)),
        404 => Error::LLMError(format!("Model not found: {}", body)),
        500..=599 => Error::LLMError(format!("Server error ({}): {}", status, body)),
        _ => Error::LLMError(format!("HTTP error {}: {}", status, body)),
    }
}
