//! Palette Core Library
//!
//! This crate provides the core functionality for Palette, including:
//! - Feature plans, templates and keyword analysis
//! - Multi-step generation (plan, then execute step by step or in batch)
//! - Single component generation and refinement
//! - Conversation engine with intent detection and JSON history
//! - LLM providers (OpenAI, Anthropic)
//! - Cost management and budget enforcement

pub mod config;
pub mod conversation;
pub mod cost;
pub mod domain;
pub mod error;
pub mod generation;
pub mod llm;

pub use error::{Error, Result};

#[cfg(test)]
mod error_tests;
#[cfg(test)]
pub(crate) mod test_support;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::conversation::{ConversationEngine, EngineReply, ExecutionMode};
    pub use crate::domain::feature_plan::{FeaturePlan, FeaturePlanner, GenerationStep};
    pub use crate::error::{Error, Result};
    pub use crate::generation::{MultiStepGenerator, ProjectContext};
}
