//! Provider abstraction and construction
//!
//! Generation code only ever sees `Arc<dyn LlmProvider>`. The concrete
//! providers share [`ProviderCore`] for HTTP, budget checks and cost
//! recording.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{API_KEY_ENV, LlmConfig};
use crate::cost::{CostTracker, TokenUsage};
use crate::error::{Error, Result};

use super::anthropic::AnthropicProvider;
use super::openai::OpenAiProvider;
use super::retry::is_model_error;
use super::types::{LlmResponse, Message};

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Provider-specific API key variable, consulted after `PALETTE_API_KEY`
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    pub fn default_fallback_models(&self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["gpt-4o-mini"],
            Self::Anthropic => &["claude-3-5-haiku-latest"],
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(format!(
                "Unknown provider '{}'. Supported providers: openai, anthropic",
                other
            )),
        }
    }
}

/// A chat-completion backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn default_model(&self) -> &str;

    fn fallback_models(&self) -> &[String];

    /// Single completion against `model`, or the default model when `None`
    async fn complete(&self, messages: Vec<Message>, model: Option<&str>) -> Result<LlmResponse>;

    /// Try the default model, then each fallback on recoverable errors
    async fn complete_with_fallback(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let mut models = vec![self.default_model().to_string()];
        models.extend(self.fallback_models().iter().cloned());

        let mut last_error = None;

        for model in &models {
            debug!(model = %model, "Attempting chat completion");

            match self.complete(messages.clone(), Some(model)).await {
                Ok(response) => {
                    info!(model = %model, tokens = response.tokens_used, "Chat completion successful");
                    return Ok(response);
                }
                Err(Error::RateLimited(secs)) => {
                    warn!(model = %model, wait_secs = secs, "Rate limited, trying next model");
                    last_error = Some(Error::RateLimited(secs));
                }
                Err(Error::LLMError(msg)) if is_model_error(&msg) => {
                    warn!(model = %model, error = %msg, "Model error, trying next model");
                    last_error = Some(Error::LLMError(msg));
                }
                Err(e) => {
                    error!(model = %model, error = %e, "Non-recoverable error");
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::NoSuitableModel("All models failed".to_string())))
    }
}

/// State shared by the HTTP providers
#[derive(Clone)]
pub(crate) struct ProviderCore {
    pub(crate) http_client: HttpClient,
    pub(crate) config: LlmConfig,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) cost_tracker: Option<Arc<CostTracker>>,
}

impl fmt::Debug for ProviderCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCore")
            .field("provider", &self.config.provider)
            .field("base_url", &self.base_url)
            .field("default_model", &self.config.default_model)
            .field("cost_tracker", &self.cost_tracker.is_some())
            .finish()
    }
}

impl ProviderCore {
    pub(crate) fn model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.config.default_model)
    }

    pub(crate) fn check_budget(&self) -> Result<()> {
        match &self.cost_tracker {
            Some(tracker) => tracker.check_budget(),
            None => Ok(()),
        }
    }

    pub(crate) fn record_usage(&self, response: &LlmResponse) {
        if let Some(tracker) = &self.cost_tracker {
            tracker.record(
                &response.model,
                TokenUsage::new(response.input_tokens, response.output_tokens),
                None,
            );
        }
    }
}

/// Builder for a provider of the configured kind
#[derive(Default)]
pub struct ProviderBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    cost_tracker: Option<Arc<CostTracker>>,
    timeout_secs: Option<u64>,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL (defaults to the config, then the vendor URL)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn cost_tracker(mut self, tracker: Arc<CostTracker>) -> Self {
        self.cost_tracker = Some(tracker);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub(crate) fn build_core(self) -> Result<ProviderCore> {
        let config = self.config.unwrap_or_default();
        let api_key = self.api_key.ok_or_else(|| {
            Error::MissingApiKey(
                config.provider.to_string(),
                config.provider.api_key_env().to_string(),
            )
        })?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .or_else(|| config.base_url.clone())
            .unwrap_or_else(|| config.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(ProviderCore {
            http_client,
            config,
            api_key,
            base_url,
            cost_tracker: self.cost_tracker,
        })
    }

    /// Build the provider selected by `config.provider`
    pub fn build(self) -> Result<Arc<dyn LlmProvider>> {
        let core = self.build_core()?;
        Ok(match core.config.provider {
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_core(core)),
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_core(core)),
        })
    }
}

/// Build a provider from configuration, resolving the API key from the
/// environment
pub fn build_provider(
    config: &LlmConfig,
    cost_tracker: Option<Arc<CostTracker>>,
) -> Result<Arc<dyn LlmProvider>> {
    let api_key = config
        .resolved_api_key()
        .map_err(|e| Error::ConfigError(e.to_string()))?
        .ok_or_else(|| {
            Error::MissingApiKey(
                config.provider.to_string(),
                config.provider.api_key_env().to_string(),
            )
        })?;

    debug!(provider = %config.provider, key_env = API_KEY_ENV, "Building LLM provider");

    let mut builder = ProviderBuilder::new().config(config.clone()).api_key(api_key);
    if let Some(tracker) = cost_tracker {
        builder = builder.cost_tracker(tracker);
    }
    builder.build()
}
