//! In-memory provider for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::llm::{FinishReason, LlmProvider, LlmResponse, Message, ProviderKind};

/// Provider that answers from a queue and records every request
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
    models: Mutex<Vec<String>>,
    fallback_models: Vec<String>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
            fallback_models: Vec::new(),
        }
    }

    pub(crate) fn with_fallback_models(mut self, models: &[&str]) -> Self {
        self.fallback_models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub(crate) fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()));
        self
    }

    pub(crate) fn fail(self, error: Error) -> Self {
        self.push(Err(error));
        self
    }

    /// Reply with one fenced block announced by `path`
    pub(crate) fn code_reply(self, path: &str, code: &str) -> Self {
        self.reply(fenced(path, code))
    }

    pub(crate) fn push(&self, reply: Result<String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }

    /// Model requested by each call, in order
    pub(crate) fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Content of the last message of call `index`
    pub(crate) fn prompt(&self, index: usize) -> String {
        self.calls.lock().unwrap()[index]
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn fallback_models(&self) -> &[String] {
        &self.fallback_models
    }

    async fn complete(&self, messages: Vec<Message>, model: Option<&str>) -> Result<LlmResponse> {
        self.calls.lock().unwrap().push(messages);
        self.models
            .lock()
            .unwrap()
            .push(model.unwrap_or("scripted-model").to_string());
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::LLMError("no scripted reply left".to_string())));

        next.map(|content| LlmResponse {
            content,
            model: model.unwrap_or("scripted-model").to_string(),
            tokens_used: 100,
            input_tokens: 60,
            output_tokens: 40,
            finish_reason: FinishReason::Stop,
        })
    }
}

pub(crate) fn fenced(path: &str, code: &str) -> String {
    let language = path.rsplit('.').next().unwrap_or("tsx");
    format!("Here you go.\n\n**{}**\n```{}\n{}\n```\n", path, language, code)
}
