//! Generation steps
//!
//! A step is one file the plan will produce. Steps move
//! `pending -> in_progress -> completed | failed` and never run twice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of artifact a step generates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Component,
    Hook,
    Util,
    Page,
    Test,
}

impl StepType {
    /// Steps of this type get a companion test step
    pub fn is_testable(&self) -> bool {
        matches!(self, Self::Component | Self::Page | Self::Hook)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component => write!(f, "component"),
            Self::Hook => write!(f, "hook"),
            Self::Util => write!(f, "util"),
            Self::Page => write!(f, "page"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Status of a generation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    /// Completed or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Estimated size of a feature, ordered from smallest to largest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Moderate => write!(f, "moderate"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            other => Err(format!(
                "Unknown complexity '{}'. Expected simple, moderate or complex",
                other
            )),
        }
    }
}

/// Code produced for a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Path relative to the output root
    pub file_path: String,
    /// Fence language of the extracted block (`tsx`, `ts`, ...)
    pub language: String,
    pub code: String,
    /// Model that produced the code
    pub model: String,
    pub tokens_used: u32,
}

/// One file to generate within a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStep {
    /// Unique within the plan (`step-N`)
    pub id: String,
    pub step_type: StepType,
    /// Identifier of the generated artifact, e.g. `LoginForm` or `useAuth`
    pub name: String,
    pub description: String,
    /// Relative to the output root
    pub file_path: String,
    /// Ids of steps that must complete first
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<GeneratedCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationStep {
    pub fn new(
        id: impl Into<String>,
        step_type: StepType,
        name: impl Into<String>,
        description: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            step_type,
            name: name.into(),
            description: description.into(),
            file_path: file_path.into(),
            dependencies: Vec::new(),
            status: StepStatus::Pending,
            output: None,
            error: None,
        }
    }

    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }

    pub fn with_dependencies(mut self, step_ids: Vec<String>) -> Self {
        self.dependencies.extend(step_ids);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }

    /// Mark as in progress
    pub fn start(&mut self) {
        self.status = StepStatus::InProgress;
    }

    /// Mark as completed with its generated code
    pub fn complete(&mut self, output: GeneratedCode) {
        self.status = StepStatus::Completed;
        self.output = Some(output);
        self.error = None;
    }

    /// Mark as failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code() -> GeneratedCode {
        GeneratedCode {
            file_path: "src/components/auth/LoginForm.tsx".to_string(),
            language: "tsx".to_string(),
            code: "export function LoginForm() {}".to_string(),
            model: "gpt-4o".to_string(),
            tokens_used: 42,
        }
    }

    #[test]
    fn test_step_creation() {
        let step = GenerationStep::new(
            "step-1",
            StepType::Component,
            "LoginForm",
            "Login form",
            "src/components/auth/LoginForm.tsx",
        )
        .with_dependency("step-0");

        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.dependencies, vec!["step-0"]);
        assert!(step.output.is_none());
    }

    #[test]
    fn test_step_lifecycle() {
        let mut step = GenerationStep::new("step-1", StepType::Hook, "useAuth", "", "src/hooks/useAuth.ts");

        step.start();
        assert_eq!(step.status, StepStatus::InProgress);
        assert!(!step.status.is_terminal());

        step.complete(sample_code());
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.status.is_terminal());
        assert_eq!(step.output.as_ref().unwrap().tokens_used, 42);

        let mut failing = GenerationStep::new("step-2", StepType::Util, "format", "", "src/lib/format.ts");
        failing.fail("LLM API error: boom");
        assert_eq!(failing.status, StepStatus::Failed);
        assert_eq!(failing.error.as_deref(), Some("LLM API error: boom"));
    }

    #[test]
    fn test_complexity_ordering() {
        assert!(Complexity::Simple < Complexity::Moderate);
        assert!(Complexity::Moderate < Complexity::Complex);
        assert_eq!("COMPLEX".parse::<Complexity>(), Ok(Complexity::Complex));
        assert!("huge".parse::<Complexity>().is_err());
    }

    #[test]
    fn test_testable_types() {
        assert!(StepType::Component.is_testable());
        assert!(StepType::Page.is_testable());
        assert!(StepType::Hook.is_testable());
        assert!(!StepType::Util.is_testable());
        assert!(!StepType::Test.is_testable());
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&StepStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        let json = r#"{"id":"step-1","step_type":"page","name":"Dashboard","description":"","file_path":"src/pages/DashboardPage.tsx"}"#;
        let step: GenerationStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.dependencies.is_empty());
    }
}
