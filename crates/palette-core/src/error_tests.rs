//! Error module tests

use crate::error::{Error, Result};

#[test]
fn test_step_not_found_error() {
    let error = Error::StepNotFound("step-9".to_string());
    assert_eq!(error.code(), "E001");
    assert_eq!(error.suggestion(), None);
    assert!(error.to_string().contains("step-9"));
}

#[test]
fn test_no_active_plan_error() {
    let error = Error::NoActivePlan;
    assert_eq!(error.code(), "E002");
    assert!(error.suggestion().unwrap().contains("palette plan"));
}

#[test]
fn test_dependencies_not_met_error() {
    let error = Error::DependenciesNotMet("step-3".to_string(), "step-1, step-2".to_string());
    assert_eq!(error.code(), "E004");
    let message = error.to_string();
    assert!(message.contains("step-3"));
    assert!(message.contains("step-1, step-2"));
}

#[test]
fn test_missing_api_key_error() {
    let error = Error::MissingApiKey("anthropic".to_string(), "ANTHROPIC_API_KEY".to_string());
    assert_eq!(error.code(), "E103");
    assert_eq!(
        error.suggestion(),
        Some("export ANTHROPIC_API_KEY=<key>".to_string())
    );
    assert!(error.to_string().contains("PALETTE_API_KEY"));
}

#[test]
fn test_budget_exceeded_error() {
    let error = Error::BudgetExceeded(15.0, 10.0, 20.0);
    assert_eq!(error.code(), "E200");
    assert_eq!(
        error.suggestion(),
        Some("palette config set cost.daily_limit_usd 20".to_string())
    );
    assert!(error.to_string().contains("$15.00/$10.00"));
}

#[test]
fn test_rate_limited_error() {
    let error = Error::RateLimited(30);
    assert_eq!(error.code(), "E102");
    assert!(error.to_string().contains("30"));
    assert!(error.is_recoverable());
}

#[test]
fn test_model_errors_are_recoverable() {
    assert!(Error::LLMError("The model is overloaded".to_string()).is_recoverable());
    assert!(!Error::LLMError("Unauthorized".to_string()).is_recoverable());
    assert!(!Error::InvalidInput("x".to_string()).is_recoverable());
}

#[test]
fn test_io_error_conversion() {
    fn fails() -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))?;
        Ok(())
    }

    let error = fails().unwrap_err();
    assert_eq!(error.code(), "E9999");
    assert!(error.to_string().contains("missing"));
}

#[test]
fn test_json_error_conversion() {
    let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
    let error: Error = parse.unwrap_err().into();
    assert_eq!(error.code(), "E9999");
}

#[test]
fn test_input_config_and_history_codes() {
    let cases = [
        (Error::ConfigError("bad toml".to_string()), "E600"),
        (Error::InvalidInput("empty".to_string()), "E800"),
        (Error::NoCodeGenerated("LoginForm".to_string()), "E801"),
        (Error::HistoryError("version 9".to_string()), "E900"),
    ];
    for (error, code) in cases {
        assert_eq!(error.code(), code, "{}", error);
    }
    assert_eq!(
        Error::ConfigError("x".to_string()).suggestion().as_deref(),
        Some("palette config list")
    );
}
