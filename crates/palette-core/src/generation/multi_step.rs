//! Multi-step feature generation
//!
//! Plans a feature, then runs its steps one at a time in plan order. Each
//! step prompt carries the code of the steps it depends on. A failing step
//! is recorded on the plan and never stops the remaining steps.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::feature_plan::{
    FeaturePlan, FeaturePlanner, GeneratedCode, PlanOptions, StepStatus,
};
use crate::error::{Error, Result};
use crate::llm::{LlmProvider, Message};

use super::component::code_from_response;
use super::project::ProjectContext;
use super::prompts;

/// Default cap on dependency code per step prompt
pub const DEFAULT_MAX_DEPENDENCY_CHARS: usize = 4000;

/// Result of executing one step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step_id: String,
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<GeneratedCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Completed
    }

    pub fn tokens_used(&self) -> u32 {
        self.output.as_ref().map(|o| o.tokens_used).unwrap_or(0)
    }
}

/// Progress events emitted by [`MultiStepGenerator::execute_all`]
#[derive(Debug, Clone)]
pub enum StepProgress {
    StepStarted {
        /// 1-based position among the steps run by this call
        index: usize,
        total: usize,
        step_id: String,
        name: String,
    },
    StepFinished {
        index: usize,
        total: usize,
        outcome: StepOutcome,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedStep {
    pub step_id: String,
    pub name: String,
    pub error: String,
}

/// Summary of one `execute_all` run
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub completed: Vec<String>,
    pub failed: Vec<FailedStep>,
    pub files: Vec<GeneratedCode>,
    pub tokens_used: u32,
}

impl ExecutionReport {
    fn new(plan: &FeaturePlan) -> Self {
        Self {
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            completed: Vec::new(),
            failed: Vec::new(),
            files: Vec::new(),
            tokens_used: 0,
        }
    }

    fn record(&mut self, outcome: &StepOutcome) {
        self.tokens_used += outcome.tokens_used();
        match (&outcome.output, outcome.status) {
            (Some(output), StepStatus::Completed) => {
                self.completed.push(outcome.step_id.clone());
                self.files.push(output.clone());
            }
            _ => self.failed.push(FailedStep {
                step_id: outcome.step_id.clone(),
                name: outcome.name.clone(),
                error: outcome.error.clone().unwrap_or_default(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {} step(s) completed, {} failed, {} tokens",
            self.plan_name,
            self.completed.len(),
            self.failed.len(),
            self.tokens_used
        );
        for file in &self.files {
            let _ = writeln!(out, "  + {}", file.file_path);
        }
        for failed in &self.failed {
            let _ = writeln!(out, "  ! {} ({}): {}", failed.name, failed.step_id, failed.error);
        }
        out
    }
}

/// Plans features and executes their steps against an LLM provider
pub struct MultiStepGenerator {
    planner: FeaturePlanner,
    provider: Arc<dyn LlmProvider>,
    project: ProjectContext,
    max_dependency_chars: usize,
}

impl MultiStepGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, project: ProjectContext) -> Self {
        Self {
            planner: FeaturePlanner::new(),
            provider,
            project,
            max_dependency_chars: DEFAULT_MAX_DEPENDENCY_CHARS,
        }
    }

    /// Generator using the project and limits from `config`
    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &Config) -> Self {
        Self::new(provider, config.project.clone())
            .with_max_dependency_chars(config.generation.max_dependency_chars)
    }

    pub fn with_max_dependency_chars(mut self, max_chars: usize) -> Self {
        self.max_dependency_chars = max_chars;
        self
    }

    pub fn project(&self) -> &ProjectContext {
        &self.project
    }

    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        self.provider.clone()
    }

    pub fn create_plan(&self, request: &str) -> Result<FeaturePlan> {
        self.planner.create_plan(request, &self.project)
    }

    pub fn create_plan_with(&self, request: &str, options: PlanOptions) -> Result<FeaturePlan> {
        self.planner.create_plan_with(request, &self.project, options)
    }

    /// Execute one pending step whose dependencies have completed
    ///
    /// Generation failures end up on the step and in the outcome; only
    /// misuse (unknown step, wrong state, unmet dependencies) is an `Err`.
    pub async fn execute_step(&self, plan: &mut FeaturePlan, step_id: &str) -> Result<StepOutcome> {
        let step = plan
            .get_step(step_id)
            .cloned()
            .ok_or_else(|| Error::StepNotFound(step_id.to_string()))?;

        if !step.is_pending() {
            return Err(Error::InvalidStepState(
                step_id.to_string(),
                step.status.to_string(),
            ));
        }

        if let Some(failed_dep) = plan.blocking_failure(&step) {
            let message = format!("blocked by failed dependency {}", failed_dep);
            warn!(step_id = %step_id, dependency = %failed_dep, "Skipping blocked step");
            return Ok(self.finish(plan, step_id, Err(message)));
        }

        let unmet = plan.unmet_dependencies(&step);
        if !unmet.is_empty() {
            return Err(Error::DependenciesNotMet(
                step_id.to_string(),
                unmet.join(", "),
            ));
        }

        let prompt = prompts::step_prompt(plan, &step, &self.project, self.max_dependency_chars);
        if let Some(running) = plan.get_step_mut(step_id) {
            running.start();
        }

        info!(
            plan_id = %plan.id,
            step_id = %step_id,
            step_type = %step.step_type,
            name = %step.name,
            "Executing step"
        );

        let messages = vec![
            Message::system(prompts::system_prompt(&self.project)),
            Message::user(prompt),
        ];

        let result = match self.provider.complete_with_fallback(messages).await {
            Ok(response) => {
                debug!(step_id = %step_id, tokens = response.tokens_used, "Step response received");
                code_from_response(
                    &response,
                    &step.file_path,
                    self.project.language_for(step.step_type),
                    &step.name,
                )
            }
            Err(e) => Err(e),
        };

        Ok(self.finish(plan, step_id, result.map_err(|e| e.to_string())))
    }

    fn finish(
        &self,
        plan: &mut FeaturePlan,
        step_id: &str,
        result: std::result::Result<GeneratedCode, String>,
    ) -> StepOutcome {
        let Some(step) = plan.get_step_mut(step_id) else {
            return StepOutcome {
                step_id: step_id.to_string(),
                name: String::new(),
                status: StepStatus::Failed,
                output: None,
                error: Some(format!("step '{}' disappeared from the plan", step_id)),
            };
        };

        match result {
            Ok(code) => {
                info!(step_id = %step_id, path = %code.file_path, "Step completed");
                step.complete(code);
            }
            Err(message) => {
                warn!(step_id = %step_id, error = %message, "Step failed");
                step.fail(message);
            }
        }

        StepOutcome {
            step_id: step.id.clone(),
            name: step.name.clone(),
            status: step.status,
            output: step.output.clone(),
            error: step.error.clone(),
        }
    }

    /// Execute the first pending step; `None` when nothing is pending
    pub async fn execute_next(&self, plan: &mut FeaturePlan) -> Result<Option<StepOutcome>> {
        let Some(step_id) = plan.next_pending_step().map(|s| s.id.clone()) else {
            return Ok(None);
        };
        self.execute_step(plan, &step_id).await.map(Some)
    }

    /// Execute every pending step in plan order
    ///
    /// A step whose dependencies did not complete is recorded as failed and
    /// the loop moves on.
    pub async fn execute_all<F>(&self, plan: &mut FeaturePlan, mut on_progress: F) -> Result<ExecutionReport>
    where
        F: FnMut(&StepProgress),
    {
        plan.validate()?;

        let pending: Vec<(String, String)> = plan
            .steps
            .iter()
            .filter(|s| s.is_pending())
            .map(|s| (s.id.clone(), s.name.clone()))
            .collect();
        let total = pending.len();
        let mut report = ExecutionReport::new(plan);

        info!(plan_id = %plan.id, steps = total, "Executing plan");

        for (position, (step_id, name)) in pending.into_iter().enumerate() {
            let index = position + 1;
            on_progress(&StepProgress::StepStarted {
                index,
                total,
                step_id: step_id.clone(),
                name,
            });

            let outcome = match self.execute_step(plan, &step_id).await {
                Ok(outcome) => outcome,
                Err(Error::DependenciesNotMet(_, unmet)) => {
                    let message = format!("dependencies never completed: {}", unmet);
                    warn!(step_id = %step_id, dependencies = %unmet, "Skipping step with unfinished dependencies");
                    self.finish(plan, &step_id, Err(message))
                }
                Err(e) => return Err(e),
            };
            report.record(&outcome);

            on_progress(&StepProgress::StepFinished {
                index,
                total,
                outcome,
            });
        }

        info!(
            plan_id = %plan.id,
            completed = report.completed.len(),
            failed = report.failed.len(),
            tokens = report.tokens_used,
            "Plan execution finished"
        );

        Ok(report)
    }
}
