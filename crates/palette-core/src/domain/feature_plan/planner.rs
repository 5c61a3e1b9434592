//! Feature planner
//!
//! Expands the template matching a request into an ordered, validated plan.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::generation::ProjectContext;

use super::analyzer::{RequestAnalysis, analyze, camel_case, kebab_case};
use super::plan::FeaturePlan;
use super::step::{Complexity, GenerationStep, StepType};
use super::templates::{FeatureType, template_for};

/// Overrides for what the analyzer would decide on its own
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub complexity: Option<Complexity>,
    /// `Some(false)` never adds test steps, `Some(true)` always does
    pub include_tests: Option<bool>,
}

/// Turns feature requests into plans
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturePlanner;

impl FeaturePlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, request: &str) -> RequestAnalysis {
        analyze(request)
    }

    /// Plan a feature request for the given project layout
    pub fn create_plan(&self, request: &str, project: &ProjectContext) -> Result<FeaturePlan> {
        self.create_plan_with(request, project, PlanOptions::default())
    }

    pub fn create_plan_with(
        &self,
        request: &str,
        project: &ProjectContext,
        options: PlanOptions,
    ) -> Result<FeaturePlan> {
        let request = request.trim();
        if request.is_empty() {
            return Err(Error::InvalidInput(
                "Feature request must not be empty".to_string(),
            ));
        }

        let analysis = analyze(request);
        let complexity = options.complexity.unwrap_or(analysis.complexity);
        let template = template_for(analysis.feature_type);

        let plan_name = if analysis.feature_type != FeatureType::Custom
            && analysis.feature_name == "Feature"
        {
            template.display_name.to_string()
        } else {
            analysis.feature_name.clone()
        };
        let feature_slug = kebab_case(&plan_name);

        debug!(
            feature_type = %analysis.feature_type,
            score = analysis.score,
            complexity = %complexity,
            name = %plan_name,
            "Analyzed feature request"
        );

        let mut steps: Vec<GenerationStep> = Vec::new();
        let mut ids_by_key: HashMap<&str, String> = HashMap::new();

        for template_step in template.steps.iter().filter(|s| s.tier <= complexity) {
            let id = format!("step-{}", steps.len() + 1);
            let name = fill_placeholders(template_step.name, &plan_name);
            let description = fill_placeholders(template_step.description, &plan_name);
            let file_path = project.file_path_for(template_step.step_type, &name, &feature_slug);

            // Dependencies on steps below the complexity tier are dropped
            let dependencies = template_step
                .depends_on
                .iter()
                .filter_map(|key| ids_by_key.get(key).cloned())
                .collect();

            ids_by_key.insert(template_step.key, id.clone());
            steps.push(
                GenerationStep::new(id, template_step.step_type, name, description, file_path)
                    .with_dependencies(dependencies),
            );
        }

        let include_tests = match options.include_tests.or(analysis.wants_tests) {
            Some(explicit) => explicit,
            None => complexity >= Complexity::Moderate,
        };

        if include_tests {
            let subjects: Vec<(String, String)> = steps
                .iter()
                .filter(|s| s.step_type.is_testable())
                .map(|s| (s.id.clone(), test_subject_name(s)))
                .collect();

            for (subject_id, subject) in subjects {
                let id = format!("step-{}", steps.len() + 1);
                let file_path = project.file_path_for(StepType::Test, &subject, &feature_slug);
                steps.push(
                    GenerationStep::new(
                        id,
                        StepType::Test,
                        subject.clone(),
                        format!("Tests for {} covering rendering and key interactions", subject),
                        file_path,
                    )
                    .with_dependency(subject_id),
                );
            }
        }

        let mut plan = FeaturePlan::new(plan_name, request, analysis.feature_type, complexity);
        plan.steps = steps;
        plan.validate()?;

        info!(
            plan_id = %plan.id,
            feature_type = %plan.feature_type,
            complexity = %plan.complexity,
            steps = plan.steps.len(),
            "Created feature plan"
        );

        Ok(plan)
    }
}

fn fill_placeholders(template: &str, feature_name: &str) -> String {
    template
        .replace("{Name}", feature_name)
        .replace("{name}", &camel_case(feature_name))
}

/// Name of the artifact a test step covers
fn test_subject_name(step: &GenerationStep) -> String {
    match step.step_type {
        StepType::Page => format!("{}Page", step.name),
        _ => step.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feature_plan::StepStatus;
    use crate::generation::Framework;

    fn ids(plan: &FeaturePlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.id.as_str()).collect()
    }

    fn names(plan: &FeaturePlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let planner = FeaturePlanner::new();
        let result = planner.create_plan("   ", &ProjectContext::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_simple_request_keeps_simple_tier_only() {
        let plan = FeaturePlanner::new()
            .create_plan("a simple login form", &ProjectContext::default())
            .unwrap();

        assert_eq!(plan.feature_type, FeatureType::Authentication);
        assert_eq!(plan.complexity, Complexity::Simple);
        assert_eq!(names(&plan), vec!["LoginForm"]);
        // useAuth and authValidation were not admitted
        assert!(plan.steps[0].dependencies.is_empty());
        assert_eq!(plan.name, "LoginForm");
        assert_eq!(
            plan.steps[0].file_path,
            "src/components/login-form/LoginForm.tsx"
        );
    }

    #[test]
    fn test_moderate_plan_adds_tests_after_main_steps() {
        let plan = FeaturePlanner::new()
            .create_plan("user authentication with login and signup", &ProjectContext::default())
            .unwrap();

        assert_eq!(plan.complexity, Complexity::Moderate);
        assert_eq!(
            names(&plan)[..5],
            ["authValidation", "useAuth", "LoginForm", "SignupForm", "Login"]
        );

        let login = plan.get_step("step-3").unwrap();
        assert_eq!(login.dependencies, vec!["step-2", "step-1"]);

        let tests: Vec<_> = plan
            .steps
            .iter()
            .filter(|s| s.step_type == StepType::Test)
            .collect();
        // useAuth, LoginForm, SignupForm and the page
        assert_eq!(tests.len(), 4);
        assert_eq!(tests[0].dependencies, vec!["step-2"]);
        assert!(tests.iter().any(|t| t.file_path == "src/__tests__/LoginPage.test.tsx"));

        assert_eq!(ids(&plan).len(), 9);
        assert_eq!(ids(&plan)[8], "step-9");
        assert!(plan.steps.iter().all(|s| s.status == StepStatus::Pending));
        plan.validate().unwrap();
    }

    #[test]
    fn test_explicit_test_preferences() {
        let planner = FeaturePlanner::new();
        let project = ProjectContext::default();

        let without = planner
            .create_plan("settings page with profile and notifications, no tests", &project)
            .unwrap();
        assert!(without.steps.iter().all(|s| s.step_type != StepType::Test));

        let with = planner
            .create_plan("a simple login form with tests", &project)
            .unwrap();
        assert_eq!(names(&with), vec!["LoginForm", "LoginForm"]);
        assert_eq!(with.steps[1].step_type, StepType::Test);
        assert_eq!(with.steps[1].dependencies, vec!["step-1"]);
    }

    #[test]
    fn test_options_override_analysis() {
        let plan = FeaturePlanner::new()
            .create_plan_with(
                "a simple login form",
                &ProjectContext::default(),
                PlanOptions {
                    complexity: Some(Complexity::Complex),
                    include_tests: Some(false),
                },
            )
            .unwrap();

        assert_eq!(plan.complexity, Complexity::Complex);
        assert_eq!(plan.steps.len(), 7);
        assert!(names(&plan).contains(&"ProtectedRoute"));
    }

    #[test]
    fn test_custom_plan_uses_feature_name() {
        let plan = FeaturePlanner::new()
            .create_plan("a recipe browser with favourites, no tests", &ProjectContext::default())
            .unwrap();

        assert_eq!(plan.feature_type, FeatureType::Custom);
        assert_eq!(plan.name, "RecipeBrowser");
        assert_eq!(
            names(&plan),
            vec!["useRecipeBrowser", "RecipeBrowserItem", "RecipeBrowser"]
        );
        assert_eq!(plan.steps[2].dependencies, vec!["step-1", "step-2"]);
        assert_eq!(plan.steps[0].file_path, "src/hooks/useRecipeBrowser.ts");
    }

    #[test]
    fn test_nextjs_page_paths() {
        let project = ProjectContext {
            framework: Framework::NextJs,
            pages_dir: "app".to_string(),
            ..ProjectContext::default()
        };

        let plan = FeaturePlanner::new()
            .create_plan("analytics dashboard page, no tests", &project)
            .unwrap();

        let page = plan
            .steps
            .iter()
            .find(|s| s.step_type == StepType::Page)
            .unwrap();
        assert_eq!(page.file_path, "app/dashboard/page.tsx");
    }
}
