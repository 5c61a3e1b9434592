//! Conversation engine
//!
//! Routes each user message by phase and intent:
//!
//! - `Idle`: feature requests become plans awaiting confirmation; other
//!   messages generate, refine or explain a single component.
//! - `AwaitingConfirmation`: "yes" starts execution, "no" drops the plan.
//! - `Executing` (step-by-step mode only): "next" runs the next step.
//!
//! Every path ends back in `Idle`; status and help work in any phase.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::feature_plan::{FeaturePlan, GeneratedCode, PlanProgress};
use crate::error::{Error, Result};
use crate::generation::{
    ComponentGenerator, ExecutionReport, MultiStepGenerator, ProjectContext, StepOutcome,
};
use crate::llm::{LlmProvider, Message};

use super::history::ConversationHistory;
use super::intent::{Intent, classify_intent};

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// How a confirmed plan is executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One step per "next"
    #[default]
    StepByStep,
    /// Every step right after confirmation
    Batch,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepByStep => write!(f, "step_by_step"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "step" | "step_by_step" | "step-by-step" | "stepbystep" => Ok(Self::StepByStep),
            "batch" | "all" => Ok(Self::Batch),
            other => Err(format!(
                "Unknown execution mode '{}'. Expected step or batch",
                other
            )),
        }
    }
}

/// Where the conversation stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    #[default]
    Idle,
    AwaitingConfirmation,
    Executing,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            Self::Executing => write!(f, "executing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    PlanProposed,
    PlanCancelled,
    StepExecuted,
    PlanFinished,
    ComponentGenerated,
    ComponentRefined,
    Answer,
    Status,
    Help,
    Reminder,
}

/// Engine response to one message
#[derive(Debug, Clone, Serialize)]
pub struct EngineReply {
    pub kind: ReplyKind,
    pub intent: Intent,
    pub message: String,
    /// Files produced while handling the message
    pub files: Vec<GeneratedCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<PlanProgress>,
}

impl EngineReply {
    fn new(kind: ReplyKind, intent: Intent, message: impl Into<String>) -> Self {
        Self {
            kind,
            intent,
            message: message.into(),
            files: Vec::new(),
            progress: None,
        }
    }

    fn with_files(mut self, files: Vec<GeneratedCode>) -> Self {
        self.files = files;
        self
    }

    fn with_progress(mut self, progress: PlanProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

pub const HELP_TEXT: &str = "\
Describe what you need and Palette generates it:
  - a single component:    \"a pricing card with a monthly/yearly toggle\"
  - a whole feature:       \"user authentication with login and signup\"
  - a change:              \"make it dark themed\" (after a component)
  - a question:            \"how does the Dialog component handle focus?\"

Feature requests are planned first. Reply \"yes\" to run the plan or
\"cancel\" to drop it. In step-by-step mode say \"next\" to run each step.
\"status\" shows progress at any time.";

/// Drives planning and generation from chat messages
pub struct ConversationEngine {
    generator: MultiStepGenerator,
    components: ComponentGenerator,
    mode: ExecutionMode,
    phase: EnginePhase,
    plan: Option<FeaturePlan>,
    last_component: Option<GeneratedCode>,
    history: ConversationHistory,
    history_limit: usize,
}

impl ConversationEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, project: ProjectContext) -> Self {
        Self {
            generator: MultiStepGenerator::new(provider.clone(), project.clone()),
            components: ComponentGenerator::new(provider, project),
            mode: ExecutionMode::default(),
            phase: EnginePhase::Idle,
            plan: None,
            last_component: None,
            history: ConversationHistory::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &Config) -> Self {
        let mut engine = Self::new(provider.clone(), config.project.clone());
        engine.generator = MultiStepGenerator::from_config(provider, config);
        engine.mode = config.generation.execution_mode;
        engine.history_limit = config.generation.history_limit;
        engine
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_history(mut self, history: ConversationHistory) -> Self {
        self.history = history;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn active_plan(&self) -> Option<&FeaturePlan> {
        self.plan.as_ref()
    }

    pub fn last_component(&self) -> Option<&GeneratedCode> {
        self.last_component.as_ref()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Handle one user message
    pub async fn process_message(&mut self, input: &str) -> Result<EngineReply> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("Message must not be empty".to_string()));
        }

        let intent = classify_intent(input, self.phase, self.last_component.is_some());
        debug!(phase = %self.phase, intent = %intent, "Processing message");

        // Context for questions excludes the message being answered
        let context = self.history.recent_messages(self.history_limit);
        self.history.push_user(input, intent);

        let reply = match (self.phase, intent) {
            (_, Intent::Help) => Ok(EngineReply::new(ReplyKind::Help, intent, HELP_TEXT)),
            (_, Intent::Status) => Ok(self.status(intent)),

            (EnginePhase::AwaitingConfirmation, Intent::Confirm) => self.start_plan(intent).await,
            (EnginePhase::AwaitingConfirmation, Intent::Cancel) => Ok(self.cancel_plan(intent)),
            (EnginePhase::AwaitingConfirmation, _) => Ok(self.reminder(intent)),

            (EnginePhase::Executing, Intent::NextStep) => self.run_next_step(intent).await,
            (EnginePhase::Executing, Intent::Cancel) => Ok(self.cancel_plan(intent)),
            (EnginePhase::Executing, _) => Ok(self.reminder(intent)),

            (EnginePhase::Idle, Intent::MultiStepFeature) => self.propose_plan(input, intent),
            (EnginePhase::Idle, Intent::Refine) => self.refine(input, intent).await,
            (EnginePhase::Idle, Intent::Explain) => self.explain(input, &context, intent).await,
            (EnginePhase::Idle, _) => self.generate_component(input, intent).await,
        }?;

        self.history.push_assistant(reply.message.clone());
        Ok(reply)
    }

    fn propose_plan(&mut self, request: &str, intent: Intent) -> Result<EngineReply> {
        let plan = self.generator.create_plan(request)?;
        let message = format!(
            "{}\nReply \"yes\" to generate {} file(s) ({}), or \"cancel\" to drop the plan.",
            plan.summary(),
            plan.steps.len(),
            match self.mode {
                ExecutionMode::StepByStep => "one step at a time",
                ExecutionMode::Batch => "all at once",
            }
        );
        let progress = plan.progress();

        info!(plan_id = %plan.id, steps = plan.steps.len(), "Plan proposed");
        self.plan = Some(plan);
        self.phase = EnginePhase::AwaitingConfirmation;

        Ok(EngineReply::new(ReplyKind::PlanProposed, intent, message).with_progress(progress))
    }

    async fn start_plan(&mut self, intent: Intent) -> Result<EngineReply> {
        match self.mode {
            ExecutionMode::Batch => {
                let mut plan = self.plan.take().ok_or(Error::NoActivePlan)?;
                let result = self.generator.execute_all(&mut plan, |_| {}).await;
                self.phase = EnginePhase::Idle;
                let report = result?;
                self.remember_component(&report.files);
                Ok(self.finished_reply(&plan, &report, intent))
            }
            ExecutionMode::StepByStep => {
                self.phase = EnginePhase::Executing;
                self.run_next_step(intent).await
            }
        }
    }

    async fn run_next_step(&mut self, intent: Intent) -> Result<EngineReply> {
        let Some(plan) = self.plan.as_mut() else {
            self.phase = EnginePhase::Idle;
            return Err(Error::NoActivePlan);
        };

        let outcome = self.generator.execute_next(plan).await?;
        let progress = plan.progress();
        let finished = plan.is_finished();

        let mut message = outcome
            .as_ref()
            .map(describe_outcome)
            .unwrap_or_default();
        let files: Vec<GeneratedCode> = outcome
            .as_ref()
            .and_then(|o| o.output.clone())
            .into_iter()
            .collect();
        self.remember_component(&files);

        if finished {
            self.phase = EnginePhase::Idle;
            if let Some(plan) = self.plan.take() {
                info!(plan_id = %plan.id, "Plan finished");
                if !message.is_empty() {
                    message.push_str("\n\n");
                }
                message.push_str(&finished_message(&plan));
            }
            return Ok(EngineReply::new(ReplyKind::PlanFinished, intent, message)
                .with_files(files)
                .with_progress(progress));
        }

        message.push_str(&format!(
            "\n{}/{} steps done. Say \"next\" to continue or \"cancel\" to stop.",
            progress.completed + progress.failed,
            progress.total
        ));
        Ok(EngineReply::new(ReplyKind::StepExecuted, intent, message)
            .with_files(files)
            .with_progress(progress))
    }

    fn cancel_plan(&mut self, intent: Intent) -> EngineReply {
        let was_executing = self.phase == EnginePhase::Executing;
        self.phase = EnginePhase::Idle;

        let Some(plan) = self.plan.take() else {
            return EngineReply::new(ReplyKind::PlanCancelled, intent, "Nothing to cancel.");
        };
        let progress = plan.progress();
        info!(plan_id = %plan.id, completed = progress.completed, "Plan cancelled");

        let message = if was_executing {
            format!(
                "Stopped '{}' after {} of {} steps. Files generated so far are kept.",
                plan.name, progress.completed, progress.total
            )
        } else {
            format!("Dropped the plan for '{}'.", plan.name)
        };
        EngineReply::new(ReplyKind::PlanCancelled, intent, message).with_progress(progress)
    }

    fn reminder(&self, intent: Intent) -> EngineReply {
        let name = self.plan.as_ref().map(|p| p.name.as_str()).unwrap_or("the feature");
        let message = match self.phase {
            EnginePhase::AwaitingConfirmation => format!(
                "The plan for '{}' is waiting for confirmation. Reply \"yes\" to start or \"cancel\" to drop it.",
                name
            ),
            _ => format!(
                "'{}' is being generated. Say \"next\" for the next step, \"status\" for progress or \"cancel\" to stop.",
                name
            ),
        };
        EngineReply::new(ReplyKind::Reminder, intent, message)
    }

    fn status(&self, intent: Intent) -> EngineReply {
        match &self.plan {
            Some(plan) => {
                let progress = plan.progress();
                let message = format!(
                    "{}\nPhase: {}. {}% complete ({} completed, {} failed, {} pending).",
                    plan.summary(),
                    self.phase,
                    progress.percent(),
                    progress.completed,
                    progress.failed,
                    progress.pending
                );
                EngineReply::new(ReplyKind::Status, intent, message).with_progress(progress)
            }
            None => {
                let mut message = String::from("No active plan.");
                if let Some(component) = &self.last_component {
                    message.push_str(&format!(" Last generated: {}", component.file_path));
                }
                EngineReply::new(ReplyKind::Status, intent, message)
            }
        }
    }

    async fn generate_component(&mut self, request: &str, intent: Intent) -> Result<EngineReply> {
        let code = self.components.generate(request).await?;
        let message = format!("Generated {}\n\n{}", code.file_path, fence(&code));
        self.last_component = Some(code.clone());
        Ok(EngineReply::new(ReplyKind::ComponentGenerated, intent, message).with_files(vec![code]))
    }

    async fn refine(&mut self, instruction: &str, intent: Intent) -> Result<EngineReply> {
        let Some(previous) = self.last_component.clone() else {
            return self.generate_component(instruction, intent).await;
        };
        let code = self.components.refine(&previous, instruction).await?;
        let message = format!("Updated {}\n\n{}", code.file_path, fence(&code));
        self.last_component = Some(code.clone());
        Ok(EngineReply::new(ReplyKind::ComponentRefined, intent, message).with_files(vec![code]))
    }

    async fn explain(
        &mut self,
        question: &str,
        context: &[Message],
        intent: Intent,
    ) -> Result<EngineReply> {
        let answer = self.components.explain(question, context).await?;
        Ok(EngineReply::new(ReplyKind::Answer, intent, answer))
    }

    fn finished_reply(
        &self,
        plan: &FeaturePlan,
        report: &ExecutionReport,
        intent: Intent,
    ) -> EngineReply {
        EngineReply::new(
            ReplyKind::PlanFinished,
            intent,
            format!("{}\n{}", report.summary(), finished_message(plan)),
        )
        .with_files(report.files.clone())
        .with_progress(plan.progress())
    }

    /// Latest generated file becomes the refinement target
    fn remember_component(&mut self, files: &[GeneratedCode]) {
        if let Some(last) = files.last() {
            self.last_component = Some(last.clone());
        }
    }
}

fn fence(code: &GeneratedCode) -> String {
    format!("```{}\n{}\n```", code.language, code.code)
}

fn describe_outcome(outcome: &StepOutcome) -> String {
    match (&outcome.output, &outcome.error) {
        (Some(output), _) => format!(
            "Step {} ({}) completed: {}\n\n{}",
            outcome.step_id,
            outcome.name,
            output.file_path,
            fence(output)
        ),
        (None, Some(error)) => format!(
            "Step {} ({}) failed: {}",
            outcome.step_id, outcome.name, error
        ),
        (None, None) => format!("Step {} ({}) is {}", outcome.step_id, outcome.name, outcome.status),
    }
}

fn finished_message(plan: &FeaturePlan) -> String {
    let progress = plan.progress();
    if plan.is_complete() {
        format!("'{}' is done: all {} steps completed.", plan.name, progress.total)
    } else {
        format!(
            "'{}' finished with {} of {} steps completed and {} failed.",
            plan.name, progress.completed, progress.total, progress.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feature_plan::StepStatus;
    use crate::test_support::{ScriptedProvider, fenced};

    fn engine(provider: ScriptedProvider) -> (ConversationEngine, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        (
            ConversationEngine::new(provider.clone(), ProjectContext::default()),
            provider,
        )
    }

    /// Provider answering every step of a plan with a code block
    fn answering(count: usize) -> ScriptedProvider {
        let provider = ScriptedProvider::new();
        for i in 0..count {
            provider.push(Ok(fenced("src/generated.tsx", &format!("export const Part{} = 1;", i))));
        }
        provider
    }

    #[test]
    fn test_execution_mode_parsing() {
        assert_eq!("step".parse::<ExecutionMode>(), Ok(ExecutionMode::StepByStep));
        assert_eq!("Batch".parse::<ExecutionMode>(), Ok(ExecutionMode::Batch));
        assert!("parallel".parse::<ExecutionMode>().is_err());
        assert_eq!(ExecutionMode::StepByStep.to_string(), "step_by_step");
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let (mut engine, _) = engine(ScriptedProvider::new());
        assert!(matches!(
            engine.process_message("   ").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(engine.history().is_empty());
    }

    #[tokio::test]
    async fn test_feature_request_waits_for_confirmation() {
        let (mut engine, provider) = engine(ScriptedProvider::new());

        let reply = engine
            .process_message("build user authentication with login and signup")
            .await
            .unwrap();

        assert_eq!(reply.kind, ReplyKind::PlanProposed);
        assert_eq!(engine.phase(), EnginePhase::AwaitingConfirmation);
        assert!(reply.message.contains("Reply \"yes\""));
        assert_eq!(provider.call_count(), 0);

        let reminder = engine.process_message("what about colors").await.unwrap();
        assert_eq!(reminder.kind, ReplyKind::Reminder);
        assert!(engine.active_plan().is_some());

        let cancelled = engine.process_message("cancel").await.unwrap();
        assert_eq!(cancelled.kind, ReplyKind::PlanCancelled);
        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert!(engine.active_plan().is_none());
        assert_eq!(engine.history().len(), 6);
    }

    #[tokio::test]
    async fn test_step_by_step_execution() {
        let (mut engine, provider) = engine(answering(5));

        engine
            .process_message("user authentication with login and signup, no tests")
            .await
            .unwrap();
        assert_eq!(engine.active_plan().unwrap().steps.len(), 5);

        let first = engine.process_message("yes").await.unwrap();
        assert_eq!(first.kind, ReplyKind::StepExecuted);
        assert_eq!(engine.phase(), EnginePhase::Executing);
        assert_eq!(first.files.len(), 1);
        assert!(first.message.contains("1/5 steps done"));

        let status = engine.process_message("status").await.unwrap();
        assert_eq!(status.kind, ReplyKind::Status);
        assert_eq!(status.progress.unwrap().completed, 1);

        let mut replies = Vec::new();
        while engine.phase() == EnginePhase::Executing {
            replies.push(engine.process_message("next").await.unwrap());
        }

        assert_eq!(replies.len(), 4);
        let last = replies.last().unwrap();
        assert_eq!(last.kind, ReplyKind::PlanFinished);
        assert!(last.message.contains("all 5 steps completed"));
        assert_eq!(provider.call_count(), 5);
        assert!(engine.active_plan().is_none());
        assert!(engine.last_component().is_some());
    }

    #[tokio::test]
    async fn test_batch_execution_reports_failures() {
        let provider = ScriptedProvider::new().fail(Error::LLMError("bad gateway".to_string()));
        let (engine, provider) = engine(provider);
        let mut engine = engine.with_mode(ExecutionMode::Batch);

        engine
            .process_message("analytics dashboard page with charts, no tests")
            .await
            .unwrap();
        let steps = engine.active_plan().unwrap().steps.len();
        for _ in 1..steps {
            provider.push(Ok(fenced("src/x.tsx", "export {};")));
        }

        let reply = engine.process_message("go ahead").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::PlanFinished);
        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert!(reply.message.contains("failed"));
        assert!(reply.progress.unwrap().failed >= 1);
        assert!(engine.active_plan().is_none());
    }

    #[tokio::test]
    async fn test_cancel_during_execution_keeps_files() {
        let (mut engine, _) = engine(answering(10));

        engine
            .process_message("user authentication with login and signup")
            .await
            .unwrap();
        let first = engine.process_message("ok").await.unwrap();
        assert_eq!(first.kind, ReplyKind::StepExecuted);

        let other = engine.process_message("make the header bigger please now").await.unwrap();
        assert_eq!(other.kind, ReplyKind::Reminder);

        let stopped = engine.process_message("stop").await.unwrap();
        assert_eq!(stopped.kind, ReplyKind::PlanCancelled);
        assert!(stopped.message.contains("Files generated so far are kept"));
        assert_eq!(engine.phase(), EnginePhase::Idle);
    }

    #[tokio::test]
    async fn test_component_then_refine_then_explain() {
        let (mut engine, provider) = engine(
            ScriptedProvider::new()
                .code_reply("x.tsx", "export function PricingCard() {}")
                .code_reply("x.tsx", "export function PricingCard() { return 'dark'; }")
                .reply("Use the Switch component."),
        );

        let generated = engine.process_message("a pricing card with toggles").await.unwrap();
        assert_eq!(generated.kind, ReplyKind::ComponentGenerated);
        assert_eq!(generated.files[0].file_path, "src/components/pricing-card/PricingCard.tsx");

        let refined = engine.process_message("make it dark themed").await.unwrap();
        assert_eq!(refined.kind, ReplyKind::ComponentRefined);
        assert!(engine.last_component().unwrap().code.contains("dark"));

        let answer = engine
            .process_message("how do I toggle billing periods?")
            .await
            .unwrap();
        assert_eq!(answer.kind, ReplyKind::Answer);
        assert_eq!(answer.message, "Use the Switch component.");
        // system + the four earlier turns + the question
        assert_eq!(provider.calls()[2].len(), 6);
        assert_eq!(engine.history().len(), 6);
    }

    #[tokio::test]
    async fn test_generation_errors_propagate_and_keep_phase() {
        let (mut engine, _) = engine(
            ScriptedProvider::new().fail(Error::LLMError("Invalid API key".to_string())),
        );

        let err = engine.process_message("a login button").await.unwrap_err();
        assert!(matches!(err, Error::LLMError(_)));
        assert_eq!(engine.phase(), EnginePhase::Idle);
        // The user turn is recorded, no reply was produced
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_help_in_any_phase() {
        let (mut engine, _) = engine(ScriptedProvider::new());
        let reply = engine.process_message("help").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Help);

        engine
            .process_message("build user authentication with login and signup")
            .await
            .unwrap();
        let reply = engine.process_message("help").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Help);
        assert_eq!(engine.phase(), EnginePhase::AwaitingConfirmation);
        assert!(engine
            .active_plan()
            .unwrap()
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Pending));
    }
}
