//! Palette Core Integration Tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use palette_core::{
    Error, Result,
    conversation::{ConversationEngine, ConversationHistory, EnginePhase, ExecutionMode, ReplyKind},
    domain::feature_plan::{Complexity, FeaturePlan, PlanOptions, StepStatus, StepType},
    generation::{MultiStepGenerator, ProjectContext, WriteAction, WriteOptions, write_files},
    llm::{FinishReason, LlmProvider, LlmResponse, Message, ProviderKind},
};
use tempfile::TempDir;

/// Answers every prompt with a code block for the file the prompt asks for
#[derive(Default)]
struct EchoProvider {
    calls: AtomicUsize,
    /// Fail prompts whose target path contains this text
    fail_on: Option<&'static str>,
}

fn requested_path(prompt: &str) -> Option<&str> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("File: "))
        .map(str::trim)
}

#[async_trait]
impl LlmProvider for EchoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn default_model(&self) -> &str {
        "echo"
    }

    fn fallback_models(&self) -> &[String] {
        &[]
    }

    async fn complete(&self, messages: Vec<Message>, _model: Option<&str>) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let path = requested_path(prompt).unwrap_or("src/Answer.tsx");

        if self.fail_on.is_some_and(|needle| path.contains(needle)) {
            return Err(Error::LLMError("upstream timeout".to_string()));
        }

        let name = path
            .rsplit('/')
            .next()
            .and_then(|file| file.split('.').next())
            .unwrap_or("Answer");
        Ok(LlmResponse {
            content: format!(
                "**{}**\n```tsx\nexport function {}() {{ return null; }}\n```",
                path, name
            ),
            model: "echo".to_string(),
            tokens_used: 10,
            input_tokens: 7,
            output_tokens: 3,
            finish_reason: FinishReason::Stop,
        })
    }
}

#[tokio::test]
async fn test_plan_execute_and_write() {
    let provider = Arc::new(EchoProvider::default());
    let generator = MultiStepGenerator::new(provider.clone(), ProjectContext::default());

    let mut plan = generator
        .create_plan_with(
            "shopping cart and checkout with product grid",
            PlanOptions {
                complexity: Some(Complexity::Moderate),
                include_tests: Some(true),
            },
        )
        .unwrap();
    let total = plan.steps.len();
    assert!(plan.steps.iter().any(|s| s.step_type == StepType::Test));

    let report = generator.execute_all(&mut plan, |_| {}).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.completed.len(), total);
    assert_eq!(report.tokens_used, 10 * total as u32);
    assert_eq!(provider.calls.load(Ordering::SeqCst), total);
    assert!(plan.is_complete());

    let dir = TempDir::new().unwrap();
    let written = write_files(&report.files, dir.path(), WriteOptions::default()).unwrap();
    assert_eq!(written.len(), total);
    assert!(written.iter().all(|w| w.action == WriteAction::Created));
    assert!(dir.path().join("src/hooks/useCart.ts").exists());
}

#[tokio::test]
async fn test_failed_step_blocks_dependents_only() {
    let provider = Arc::new(EchoProvider {
        fail_on: Some("useAuth"),
        ..EchoProvider::default()
    });
    let generator = MultiStepGenerator::new(provider, ProjectContext::default());

    let mut plan = generator
        .create_plan("user authentication with login and signup, no tests")
        .unwrap();
    let report = generator.execute_all(&mut plan, |_| {}).await.unwrap();

    let status = |name: &str| {
        plan.steps
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status)
            .unwrap()
    };
    assert_eq!(status("authValidation"), StepStatus::Completed);
    assert_eq!(status("useAuth"), StepStatus::Failed);
    assert_eq!(status("LoginForm"), StepStatus::Failed);
    assert_eq!(status("SignupForm"), StepStatus::Failed);
    assert_eq!(status("Login"), StepStatus::Failed);
    assert_eq!(report.completed.len(), 1);
    assert!(plan.is_finished());
    assert!(plan.has_failures());
}

#[tokio::test]
async fn test_saved_plan_resumes_where_it_stopped() {
    let provider = Arc::new(EchoProvider::default());
    let generator = MultiStepGenerator::new(provider, ProjectContext::default());

    let mut plan = generator.create_plan("settings page, no tests").unwrap();
    generator.execute_next(&mut plan).await.unwrap();

    let mut restored = FeaturePlan::from_json(&plan.to_json().unwrap()).unwrap();
    assert_eq!(restored.progress().completed, 1);

    let report = generator.execute_all(&mut restored, |_| {}).await.unwrap();
    assert_eq!(report.completed.len(), restored.steps.len() - 1);
    assert!(restored.is_complete());
}

#[tokio::test]
async fn test_conversation_batch_workflow_with_history() {
    let provider = Arc::new(EchoProvider::default());
    let mut engine = ConversationEngine::new(provider, ProjectContext::default())
        .with_mode(ExecutionMode::Batch);

    let proposed = engine
        .process_message("a complete chat feature with conversations and messages")
        .await
        .unwrap();
    assert_eq!(proposed.kind, ReplyKind::PlanProposed);
    assert_eq!(engine.phase(), EnginePhase::AwaitingConfirmation);

    let finished = engine.process_message("yes").await.unwrap();
    assert_eq!(finished.kind, ReplyKind::PlanFinished);
    assert!(!finished.files.is_empty());
    assert_eq!(engine.phase(), EnginePhase::Idle);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    engine.history().save_json(&path).unwrap();

    let restored = ConversationHistory::load_json(&path).unwrap();
    assert_eq!(restored.len(), 4);
    assert_eq!(restored.turns()[2].content, "yes");
}

#[test]
fn test_error_codes_are_stable() {
    assert_eq!(Error::NoActivePlan.code(), "E002");
    assert_eq!(Error::NoCodeGenerated("x".into()).code(), "E801");
    assert_eq!(
        Error::MissingApiKey("openai".into(), "OPENAI_API_KEY".into()).suggestion(),
        Some("export OPENAI_API_KEY=<key>".to_string())
    );
}
