//! Feature planning
//!
//! Decomposes a natural-language feature request into an ordered plan of
//! generation steps using keyword analysis and static templates.

pub mod analyzer;
pub mod plan;
pub mod planner;
pub mod step;
pub mod templates;

pub use analyzer::{
    RequestAnalysis, analyze, classify, estimate_complexity, extract_feature_name,
    is_multi_step_request, wants_tests,
};
pub use plan::{FeaturePlan, PlanProgress};
pub use planner::{FeaturePlanner, PlanOptions};
pub use step::{Complexity, GeneratedCode, GenerationStep, StepStatus, StepType};
pub use templates::{FeatureTemplate, FeatureType, StepTemplate, template_for};
