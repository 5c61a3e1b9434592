//! Single component generation
//!
//! One-shot counterpart of the multi-step generator: generate a component,
//! refine the last one, or answer a question.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::feature_plan::analyzer::kebab_case;
use crate::domain::feature_plan::{GeneratedCode, StepType, extract_feature_name};
use crate::error::{Error, Result};
use crate::llm::{LlmProvider, LlmResponse, Message};

use super::extraction::{extract_code_blocks, select_code_block};
use super::project::ProjectContext;
use super::prompts;

/// Turn a model response into code for `file_path`
///
/// The planned path always wins over a path the model announces.
pub(crate) fn code_from_response(
    response: &LlmResponse,
    file_path: &str,
    fallback_language: &str,
    subject: &str,
) -> Result<GeneratedCode> {
    let blocks = extract_code_blocks(&response.content);
    let block =
        select_code_block(&blocks).ok_or_else(|| Error::NoCodeGenerated(subject.to_string()))?;

    let language = if block.is_script() {
        block.language.clone()
    } else {
        fallback_language.to_string()
    };

    Ok(GeneratedCode {
        file_path: file_path.to_string(),
        language,
        code: block.code.clone(),
        model: response.model.clone(),
        tokens_used: response.tokens_used,
    })
}

/// Generates and refines standalone components
pub struct ComponentGenerator {
    provider: Arc<dyn LlmProvider>,
    project: ProjectContext,
}

impl ComponentGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, project: ProjectContext) -> Self {
        Self { provider, project }
    }

    pub fn project(&self) -> &ProjectContext {
        &self.project
    }

    /// Generate one component from a free-form request
    pub async fn generate(&self, request: &str) -> Result<GeneratedCode> {
        let request = request.trim();
        if request.is_empty() {
            return Err(Error::InvalidInput(
                "Component request must not be empty".to_string(),
            ));
        }

        let name = extract_feature_name(request);
        let file_path = self
            .project
            .file_path_for(StepType::Component, &name, &kebab_case(&name));

        info!(name = %name, path = %file_path, "Generating component");

        let messages = vec![
            Message::system(prompts::system_prompt(&self.project)),
            Message::user(prompts::component_prompt(request, &file_path, &self.project)),
        ];
        let response = self.provider.complete_with_fallback(messages).await?;

        debug!(tokens = response.tokens_used, model = %response.model, "Component response received");

        code_from_response(
            &response,
            &file_path,
            self.project.component_extension(),
            &name,
        )
    }

    /// Rewrite `previous` according to `instruction`
    pub async fn refine(&self, previous: &GeneratedCode, instruction: &str) -> Result<GeneratedCode> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(Error::InvalidInput(
                "Refinement instruction must not be empty".to_string(),
            ));
        }

        info!(path = %previous.file_path, "Refining component");

        let messages = vec![
            Message::system(prompts::system_prompt(&self.project)),
            Message::user(prompts::refine_prompt(previous, instruction)),
        ];
        let response = self.provider.complete_with_fallback(messages).await?;

        code_from_response(
            &response,
            &previous.file_path,
            &previous.language,
            &previous.file_path,
        )
    }

    /// Answer a question, with earlier conversation turns as context
    pub async fn explain(&self, question: &str, history: &[Message]) -> Result<String> {
        let mut messages = vec![Message::system(prompts::explain_system_prompt(&self.project))];
        messages.extend(history.iter().cloned());
        messages.push(Message::user(question.trim()));

        debug!(history = history.len(), "Answering question");

        let response = self.provider.complete_with_fallback(messages).await?;
        Ok(response.content.trim().to_string())
    }
}
