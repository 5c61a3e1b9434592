//! Code generation
//!
//! Prompts, response extraction, single components, multi-step feature
//! execution and writing results to disk.

pub mod component;
pub mod extraction;
pub mod multi_step;
pub mod project;
pub mod prompts;
pub mod writer;

pub use crate::domain::feature_plan::GeneratedCode;
pub use component::ComponentGenerator;
pub use extraction::{CodeBlock, extract_code_blocks, select_code_block};
pub use multi_step::{
    DEFAULT_MAX_DEPENDENCY_CHARS, ExecutionReport, FailedStep, MultiStepGenerator, StepOutcome,
    StepProgress,
};
pub use project::{Framework, ProjectContext};
pub use writer::{WriteAction, WriteOptions, WrittenFile, write_files};
