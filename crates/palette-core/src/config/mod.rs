//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::conversation::ExecutionMode;
use crate::generation::{Framework, ProjectContext};
use crate::llm::ProviderKind;

/// Environment variable that overrides the provider-specific API key
pub const API_KEY_ENV: &str = "PALETTE_API_KEY";

/// Palette configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub cost: CostConfig,
    pub project: ProjectContext,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub provider: ProviderKind,
    pub default_model: String,
    pub fallback_models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    /// Custom API base URL (proxies, OpenAI-compatible servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub daily_limit_usd: f64,
    pub alert_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// How a confirmed plan is executed in conversations
    pub execution_mode: ExecutionMode,
    /// Maximum characters of dependency code included in a step prompt
    pub max_dependency_chars: usize,
    /// Number of past conversation turns sent along with questions
    pub history_limit: usize,
    /// Directory generated files are written to
    pub output_dir: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_provider(ProviderKind::OpenAi)
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            daily_limit_usd: 10.0,
            alert_threshold: 0.8,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::StepByStep,
            max_dependency_chars: 4000,
            history_limit: 10,
            output_dir: ".".to_string(),
        }
    }
}

impl LlmConfig {
    /// Default LLM settings for a provider
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            api_key: None,
            provider,
            default_model: provider.default_model().to_string(),
            fallback_models: provider
                .default_fallback_models()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            temperature: 0.7,
            max_tokens: 8192,
            timeout_secs: 120,
            base_url: None,
        }
    }

    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var(API_KEY_ENV)
            .or_else(|_| env::var(self.provider.api_key_env()))
            .ok()
            .filter(|key| !key.trim().is_empty()))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| {
            opt.map(|key| {
                if key.len() <= 4 {
                    "***".to_string()
                } else {
                    let suffix = &key[key.len() - 4..];
                    format!("***{}", suffix)
                }
            })
        })
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("PALETTE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("palette")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or return defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;
        if self.llm.default_model.trim().is_empty() {
            return Err(anyhow!("llm.default_model must not be empty"));
        }
        if self.generation.history_limit == 0 {
            return Err(anyhow!("generation.history_limit must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        let project = &self.project;
        match key {
            // LLM settings
            "llm.provider" => Ok(self.llm.provider.to_string()),
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.fallback_models" => Ok(self.llm.fallback_models.join(", ")),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),
            "llm.base_url" => Ok(self
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| self.llm.provider.default_base_url().to_string())),

            // Cost settings
            "cost.daily_limit_usd" => Ok(self.cost.daily_limit_usd.to_string()),
            "cost.alert_threshold" => Ok(self.cost.alert_threshold.to_string()),

            // Project settings
            "project.framework" => Ok(project.framework.to_string()),
            "project.typescript" => Ok(project.typescript.to_string()),
            "project.styling" => Ok(project.styling.clone()),
            "project.ui_library" => Ok(project.ui_library.clone()),
            "project.components_dir" => Ok(project.components_dir.clone()),
            "project.hooks_dir" => Ok(project.hooks_dir.clone()),
            "project.utils_dir" => Ok(project.utils_dir.clone()),
            "project.pages_dir" => Ok(project.pages_dir.clone()),
            "project.tests_dir" => Ok(project.tests_dir.clone()),
            "project.available_components" => Ok(project.available_components.join(", ")),

            // Generation settings
            "generation.execution_mode" => Ok(self.generation.execution_mode.to_string()),
            "generation.max_dependency_chars" => {
                Ok(self.generation.max_dependency_chars.to_string())
            }
            "generation.history_limit" => Ok(self.generation.history_limit.to_string()),
            "generation.output_dir" => Ok(self.generation.output_dir.clone()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(format!(
                    "(not set - use {} or {} env var)",
                    API_KEY_ENV,
                    self.llm.provider.api_key_env()
                )),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `palette config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // LLM settings
            "llm.provider" => {
                let provider: ProviderKind = value.parse().map_err(|e: String| anyhow!(e))?;
                if provider != self.llm.provider {
                    // Model names are provider specific
                    let temperature = self.llm.temperature;
                    let max_tokens = self.llm.max_tokens;
                    let timeout_secs = self.llm.timeout_secs;
                    self.llm = LlmConfig {
                        temperature,
                        max_tokens,
                        timeout_secs,
                        ..LlmConfig::for_provider(provider)
                    };
                }
            }
            "llm.default_model" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Model name must not be empty"));
                }
                self.llm.default_model = value.trim().to_string();
            }
            "llm.fallback_models" => {
                self.llm.fallback_models = split_list(value);
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }
            "llm.base_url" => {
                let trimmed = value.trim();
                self.llm.base_url = if trimmed.is_empty() {
                    None
                } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                    Some(trimmed.trim_end_matches('/').to_string())
                } else {
                    return Err(anyhow!("Base URL must start with http:// or https://"));
                };
            }

            // Cost settings
            "cost.daily_limit_usd" => {
                let limit: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid daily_limit_usd value: {}", value))?;
                if limit < 0.0 {
                    return Err(anyhow!("Daily limit must be non-negative"));
                }
                self.cost.daily_limit_usd = limit;
            }
            "cost.alert_threshold" => {
                let threshold: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid alert_threshold value: {}", value))?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(anyhow!("Alert threshold must be between 0.0 and 1.0"));
                }
                self.cost.alert_threshold = threshold;
            }

            // Project settings
            "project.framework" => {
                let framework: Framework = value.parse().map_err(|e: String| anyhow!(e))?;
                self.project.framework = framework;
            }
            "project.typescript" => {
                self.project.typescript = value
                    .parse()
                    .with_context(|| format!("Invalid typescript value: {} (use true/false)", value))?;
            }
            "project.styling" => self.project.styling = non_empty(key, value)?,
            "project.ui_library" => self.project.ui_library = non_empty(key, value)?,
            "project.components_dir" => self.project.components_dir = relative_dir(key, value)?,
            "project.hooks_dir" => self.project.hooks_dir = relative_dir(key, value)?,
            "project.utils_dir" => self.project.utils_dir = relative_dir(key, value)?,
            "project.pages_dir" => self.project.pages_dir = relative_dir(key, value)?,
            "project.tests_dir" => self.project.tests_dir = relative_dir(key, value)?,
            "project.available_components" => {
                self.project.available_components = split_list(value);
            }

            // Generation settings
            "generation.execution_mode" => {
                let mode: ExecutionMode = value.parse().map_err(|e: String| anyhow!(e))?;
                self.generation.execution_mode = mode;
            }
            "generation.max_dependency_chars" => {
                self.generation.max_dependency_chars = value
                    .parse()
                    .with_context(|| format!("Invalid max_dependency_chars value: {}", value))?;
            }
            "generation.history_limit" => {
                let limit: usize = value
                    .parse()
                    .with_context(|| format!("Invalid history_limit value: {}", value))?;
                if limit == 0 {
                    return Err(anyhow!("History limit must be at least 1"));
                }
                self.generation.history_limit = limit;
            }
            "generation.output_dir" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Output directory must not be empty"));
                }
                self.generation.output_dir = value.trim().to_string();
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the {} or {} environment variable instead.",
                    API_KEY_ENV,
                    self.llm.provider.api_key_env()
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `palette config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        CONFIG_KEYS
            .iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

/// Every key accepted by [`Config::get`], in display order
pub const CONFIG_KEYS: &[&str] = &[
    "llm.provider",
    "llm.default_model",
    "llm.fallback_models",
    "llm.temperature",
    "llm.max_tokens",
    "llm.timeout_secs",
    "llm.base_url",
    "llm.api_key",
    "cost.daily_limit_usd",
    "cost.alert_threshold",
    "project.framework",
    "project.typescript",
    "project.styling",
    "project.ui_library",
    "project.components_dir",
    "project.hooks_dir",
    "project.utils_dir",
    "project.pages_dir",
    "project.tests_dir",
    "project.available_components",
    "generation.execution_mode",
    "generation.max_dependency_chars",
    "generation.history_limit",
    "generation.output_dir",
];

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(key: &str, value: &str) -> anyhow::Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(anyhow!("{} must not be empty", key));
    }
    Ok(value.to_string())
}

fn relative_dir(key: &str, value: &str) -> anyhow::Result<String> {
    let dir = value.trim().trim_end_matches('/');
    if dir.is_empty() {
        return Err(anyhow!("{} must not be empty", key));
    }
    if dir.starts_with('/') || dir.split('/').any(|part| part == "..") {
        return Err(anyhow!("{} must be a path relative to the project root", key));
    }
    Ok(dir.to_string())
}
