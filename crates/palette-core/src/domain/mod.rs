//! Domain model
//!
//! Plans and steps are plain data; execution lives in `generation`.

pub mod feature_plan;

pub use feature_plan::{
    Complexity, FeaturePlan, FeaturePlanner, FeatureType, GeneratedCode, GenerationStep,
    PlanOptions, PlanProgress, StepStatus, StepType,
};
