//! LLM integration - OpenAI and Anthropic
//!
//! This module provides:
//! - The [`LlmProvider`] trait the generators are written against
//! - HTTP providers for OpenAI chat completions and Anthropic messages
//! - Cost tracking integration and budget checks
//! - Model fallback and rate limit retry with exponential backoff

mod anthropic;
mod openai;
mod provider;
mod retry;
mod types;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, ProviderBuilder, ProviderKind, build_provider};
pub use retry::is_model_error;
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, LlmResponse, Message, MessageRole, Usage,
};
