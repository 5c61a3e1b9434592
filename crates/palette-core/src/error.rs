//! Error types for Palette

use thiserror::Error;

/// Result type alias using Palette's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Palette error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Plan errors (E001-E099)
    #[error("Step '{0}' not found in the current plan.")]
    StepNotFound(String),

    #[error("No active plan. Describe a feature first, e.g. `palette plan \"user authentication\"`.")]
    NoActivePlan,

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Step '{0}' cannot run yet: waiting on {1}")]
    DependenciesNotMet(String, String),

    #[error("Step '{0}' is {1} and cannot be executed again")]
    InvalidStepState(String, String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("No API key for {0}. Set {1} or PALETTE_API_KEY.")]
    MissingApiKey(String, String),

    #[error("No suitable model found: {0}")]
    NoSuitableModel(String),

    // Cost errors (E200-E299)
    #[error("Daily budget exceeded (${0:.2}/${1:.2}). Increase limit with `palette config set cost.daily_limit_usd {2}`.")]
    BudgetExceeded(f64, f64, f64),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No code found in the model response for '{0}'")]
    NoCodeGenerated(String),

    // History errors (E900-E999)
    #[error("History error: {0}")]
    HistoryError(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::StepNotFound(_) => "E001",
            Self::NoActivePlan => "E002",
            Self::InvalidPlan(_) => "E003",
            Self::DependenciesNotMet(..) => "E004",
            Self::InvalidStepState(..) => "E005",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::MissingApiKey(..) => "E103",
            Self::NoSuitableModel(_) => "E104",
            Self::BudgetExceeded(..) => "E200",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::NoCodeGenerated(_) => "E801",
            Self::HistoryError(_) => "E900",
            Self::Json(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NoActivePlan => Some("palette plan \"<feature request>\"".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("palette doctor".to_string()),
            Self::MissingApiKey(_, var) => Some(format!("export {}=<key>", var)),
            Self::BudgetExceeded(_, _, suggested) => {
                Some(format!("palette config set cost.daily_limit_usd {}", suggested))
            }
            Self::ConfigError(_) => Some("palette config list".to_string()),
            _ => None,
        }
    }

    /// Whether a model fallback may succeed where this error occurred
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::NoSuitableModel(_))
            || matches!(self, Self::LLMError(msg) if crate::llm::is_model_error(msg))
    }
}
