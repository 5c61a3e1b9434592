//! Feature plans
//!
//! A plan is the ordered list of steps for one feature request. Every step
//! may only depend on steps that appear earlier, so plan order is always a
//! valid execution order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::step::{Complexity, GenerationStep, StepStatus};
use super::templates::FeatureType;

/// Step counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub in_progress: usize,
}

impl PlanProgress {
    /// Completed share of all steps, 0-100
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

/// Ordered generation plan for one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePlan {
    pub id: Uuid,
    pub name: String,
    /// The request the plan was created from
    pub description: String,
    pub feature_type: FeatureType,
    pub complexity: Complexity,
    pub steps: Vec<GenerationStep>,
    pub created_at: DateTime<Utc>,
}

impl FeaturePlan {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        feature_type: FeatureType,
        complexity: Complexity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            feature_type,
            complexity,
            steps: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_step(mut self, step: GenerationStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn get_step(&self, id: &str) -> Option<&GenerationStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn get_step_mut(&mut self, id: &str) -> Option<&mut GenerationStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Pending steps whose dependencies have all completed
    pub fn ready_steps(&self) -> Vec<&GenerationStep> {
        self.steps
            .iter()
            .filter(|s| s.is_pending() && self.dependencies_met(s))
            .collect()
    }

    /// First pending step in plan order
    pub fn next_pending_step(&self) -> Option<&GenerationStep> {
        self.steps.iter().find(|s| s.is_pending())
    }

    pub fn dependencies_met(&self, step: &GenerationStep) -> bool {
        step.dependencies.iter().all(|dep| {
            self.get_step(dep)
                .is_some_and(|d| d.status == StepStatus::Completed)
        })
    }

    /// First dependency of `step` that failed
    pub fn blocking_failure<'a>(&self, step: &'a GenerationStep) -> Option<&'a str> {
        step.dependencies
            .iter()
            .find(|dep| {
                self.get_step(dep)
                    .is_some_and(|d| d.status == StepStatus::Failed)
            })
            .map(String::as_str)
    }

    /// Dependencies of `step` that have not completed yet
    pub fn unmet_dependencies<'a>(&self, step: &'a GenerationStep) -> Vec<&'a str> {
        step.dependencies
            .iter()
            .filter(|dep| {
                !self
                    .get_step(dep)
                    .is_some_and(|d| d.status == StepStatus::Completed)
            })
            .map(String::as_str)
            .collect()
    }

    /// Every step completed
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    /// Nothing left to run
    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }

    pub fn progress(&self) -> PlanProgress {
        let mut progress = PlanProgress {
            total: self.steps.len(),
            ..PlanProgress::default()
        };
        for step in &self.steps {
            match step.status {
                StepStatus::Pending => progress.pending += 1,
                StepStatus::InProgress => progress.in_progress += 1,
                StepStatus::Completed => progress.completed += 1,
                StepStatus::Failed => progress.failed += 1,
            }
        }
        progress
    }

    /// Check the structural invariants of the plan
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::InvalidPlan("plan has no steps".to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            for dep in &step.dependencies {
                if dep == &step.id {
                    return Err(Error::InvalidPlan(format!(
                        "step '{}' depends on itself",
                        step.id
                    )));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(Error::InvalidPlan(format!(
                        "step '{}' depends on '{}', which is not an earlier step",
                        step.id, dep
                    )));
                }
            }
            if !seen.insert(step.id.as_str()) {
                return Err(Error::InvalidPlan(format!("duplicate step id '{}'", step.id)));
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a saved plan
    ///
    /// Steps saved while in progress never finished and run again.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut plan: FeaturePlan = serde_json::from_str(json)?;
        plan.validate()?;
        plan.reset_interrupted();
        Ok(plan)
    }

    /// Put in-progress steps back to pending, returning how many were reset
    pub fn reset_interrupted(&mut self) -> usize {
        let mut reset = 0;
        for step in self
            .steps
            .iter_mut()
            .filter(|s| s.status == StepStatus::InProgress)
        {
            step.status = StepStatus::Pending;
            step.output = None;
            step.error = None;
            reset += 1;
        }
        reset
    }

    /// Human-readable listing of the plan
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Feature plan: {} ({}, {})",
            self.name, self.feature_type, self.complexity
        );
        let _ = writeln!(out, "Request: {}", self.description);
        let _ = writeln!(out, "Steps:");

        for (index, step) in self.steps.iter().enumerate() {
            let _ = write!(
                out,
                "  {}. [{}] {} -> {}",
                index + 1,
                step.step_type,
                step.name,
                step.file_path
            );
            if !step.dependencies.is_empty() {
                let _ = write!(out, " (after {})", step.dependencies.join(", "));
            }
            if step.status != StepStatus::Pending {
                let _ = write!(out, " [{}]", step.status);
            }
            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feature_plan::StepType;

    fn step(id: &str, deps: &[&str]) -> GenerationStep {
        GenerationStep::new(id, StepType::Component, id.to_uppercase(), "", format!("src/{}.tsx", id))
            .with_dependencies(deps.iter().map(|d| d.to_string()).collect())
    }

    fn sample_plan() -> FeaturePlan {
        FeaturePlan::new("Auth", "login flow", FeatureType::Authentication, Complexity::Moderate)
            .with_step(step("step-1", &[]))
            .with_step(step("step-2", &["step-1"]))
            .with_step(step("step-3", &["step-1", "step-2"]))
    }

    #[test]
    fn test_ready_steps_follow_dependencies() {
        let mut plan = sample_plan();
        let ready: Vec<_> = plan.ready_steps().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ready, vec!["step-1"]);

        plan.get_step_mut("step-1").unwrap().status = StepStatus::Completed;
        let ready: Vec<_> = plan.ready_steps().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ready, vec!["step-2"]);

        let step3 = plan.get_step("step-3").unwrap();
        assert_eq!(plan.unmet_dependencies(step3), vec!["step-2"]);
    }

    #[test]
    fn test_next_pending_and_blocking_failure() {
        let mut plan = sample_plan();
        assert_eq!(plan.next_pending_step().unwrap().id, "step-1");

        plan.get_step_mut("step-1").unwrap().fail("boom");
        assert_eq!(plan.next_pending_step().unwrap().id, "step-2");

        let step2 = plan.get_step("step-2").unwrap();
        assert_eq!(plan.blocking_failure(step2), Some("step-1"));
        assert!(!plan.dependencies_met(step2));
    }

    #[test]
    fn test_progress_and_completion() {
        let mut plan = sample_plan();
        assert!(!plan.is_finished());

        plan.get_step_mut("step-1").unwrap().status = StepStatus::Completed;
        plan.get_step_mut("step-2").unwrap().status = StepStatus::InProgress;
        plan.get_step_mut("step-3").unwrap().fail("x");

        let progress = plan.progress();
        assert_eq!(
            progress,
            PlanProgress {
                total: 3,
                completed: 1,
                failed: 1,
                pending: 0,
                in_progress: 1,
            }
        );
        assert_eq!(progress.percent(), 33);
        assert!(plan.has_failures());
        assert!(!plan.is_finished());

        plan.get_step_mut("step-2").unwrap().status = StepStatus::Completed;
        assert!(plan.is_finished());
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_validate_rejects_bad_plans() {
        let empty = FeaturePlan::new("x", "x", FeatureType::Custom, Complexity::Simple);
        assert!(matches!(empty.validate(), Err(Error::InvalidPlan(_))));

        let forward = FeaturePlan::new("x", "x", FeatureType::Custom, Complexity::Simple)
            .with_step(step("step-1", &["step-2"]))
            .with_step(step("step-2", &[]));
        assert!(forward.validate().is_err());

        let self_dep = FeaturePlan::new("x", "x", FeatureType::Custom, Complexity::Simple)
            .with_step(step("step-1", &["step-1"]));
        let err = self_dep.validate().unwrap_err();
        assert!(err.to_string().contains("itself"));

        let duplicate = FeaturePlan::new("x", "x", FeatureType::Custom, Complexity::Simple)
            .with_step(step("step-1", &[]))
            .with_step(step("step-1", &[]));
        assert!(duplicate.validate().unwrap_err().to_string().contains("duplicate"));

        assert!(sample_plan().validate().is_ok());
    }

    #[test]
    fn test_json_persistence_validates() {
        let plan = sample_plan();
        let json = plan.to_json().unwrap();
        let restored = FeaturePlan::from_json(&json).unwrap();
        assert_eq!(restored.id, plan.id);
        assert_eq!(restored.steps.len(), 3);

        let mut broken = plan.clone();
        broken.steps[0].dependencies.push("step-9".to_string());
        let broken_json = serde_json::to_string(&broken).unwrap();
        assert!(matches!(
            FeaturePlan::from_json(&broken_json),
            Err(Error::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_interrupted_steps_are_pending_after_load() {
        let mut plan = sample_plan();
        plan.get_step_mut("step-1").unwrap().start();

        let restored = FeaturePlan::from_json(&plan.to_json().unwrap()).unwrap();
        assert_eq!(restored.get_step("step-1").unwrap().status, StepStatus::Pending);
        assert_eq!(restored.progress().in_progress, 0);
        assert_eq!(restored.next_pending_step().unwrap().id, "step-1");

        assert_eq!(plan.reset_interrupted(), 1);
        assert_eq!(plan.reset_interrupted(), 0);
    }

    #[test]
    fn test_summary_lists_steps() {
        let mut plan = sample_plan();
        plan.get_step_mut("step-1").unwrap().status = StepStatus::Completed;

        let summary = plan.summary();
        assert!(summary.starts_with("Feature plan: Auth (authentication, moderate)"));
        assert!(summary.contains("1. [component] STEP-1 -> src/step-1.tsx [completed]"));
        assert!(summary.contains("3. [component] STEP-3 -> src/step-3.tsx (after step-1, step-2)"));
    }
}
