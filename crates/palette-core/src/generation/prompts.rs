//! Prompt construction
//!
//! Every prompt asks for exactly one fenced code block preceded by the bold
//! file path so extraction stays unambiguous.

use std::fmt::Write as _;

use crate::domain::feature_plan::{FeaturePlan, GeneratedCode, GenerationStep, StepStatus, StepType};

use super::project::ProjectContext;

/// Marker appended to dependency code cut at the character limit
pub const TRUNCATION_MARKER: &str = "// ... truncated";

/// System prompt shared by all generation requests
pub fn system_prompt(project: &ProjectContext) -> String {
    format!(
        "You are an expert frontend engineer specialising in React, {styling} and {ui} components.\n\
         \n\
         Rules:\n\
         - Answer with exactly one fenced code block, preceded by the file path in bold (**path**).\n\
         - Write complete, production-ready code. No placeholders, no \"rest of the code\" comments.\n\
         - Use {ui} components from \"@/components/ui/*\" instead of re-implementing them.\n\
         - Style with {styling} utility classes and keep components accessible (labels, roles, keyboard support).\n\
         - {language}\n\
         - Export the main artifact as a named export.\n\
         \n\
         Project:\n{context}",
        styling = project.styling,
        ui = project.ui_library,
        language = if project.typescript {
            "Use TypeScript with explicit prop and return types."
        } else {
            "Use modern JavaScript (ES modules) without type annotations."
        },
        context = project.describe(),
    )
}

fn step_guidance(step_type: StepType) -> &'static str {
    match step_type {
        StepType::Component => {
            "Build a focused, reusable component. Take data and callbacks through props, keep \
             local UI state inside, and handle loading, empty and error states."
        }
        StepType::Hook => {
            "Build a custom React hook. Keep it free of JSX, return a stable object of state and \
             actions, and memoise callbacks."
        }
        StepType::Util => {
            "Write pure, framework-free helper functions with no side effects. Export each helper."
        }
        StepType::Page => {
            "Build a page that composes the feature's components and hooks into a complete, \
             responsive layout. Import them from the paths listed below."
        }
        StepType::Test => {
            "Write tests with Vitest and React Testing Library. Cover rendering, user interaction \
             and edge cases; mock network calls."
        }
    }
}

/// Cut `code` to at most `max_chars` characters
pub fn truncate_code(code: &str, max_chars: usize) -> String {
    match code.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}\n{}", &code[..byte_index], TRUNCATION_MARKER),
        None => code.to_string(),
    }
}

/// User prompt for one plan step, including completed dependency code
pub fn step_prompt(
    plan: &FeaturePlan,
    step: &GenerationStep,
    project: &ProjectContext,
    max_dependency_chars: usize,
) -> String {
    let position = plan
        .steps
        .iter()
        .position(|s| s.id == step.id)
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut prompt = String::new();
    let _ = writeln!(prompt, "Feature: {}", plan.name);
    let _ = writeln!(prompt, "Request: {}", plan.description);
    let _ = writeln!(
        prompt,
        "Step {}/{}: {} `{}`",
        position,
        plan.steps.len(),
        step.step_type,
        step.name
    );
    let _ = writeln!(prompt, "Task: {}", step.description);
    let _ = writeln!(prompt, "File: {}", step.file_path);
    prompt.push('\n');
    let _ = writeln!(prompt, "{}", step_guidance(step.step_type));

    let completed: Vec<&GeneratedCode> = step
        .dependencies
        .iter()
        .filter_map(|id| plan.get_step(id))
        .filter(|dep| dep.status == StepStatus::Completed)
        .filter_map(|dep| dep.output.as_ref())
        .collect();

    if !completed.is_empty() {
        let _ = writeln!(
            prompt,
            "\nIt builds on these files from earlier steps. Import from them instead of redefining what they export:"
        );
        for output in completed {
            let _ = writeln!(
                prompt,
                "\n**{}**\n```{}\n{}\n```",
                output.file_path,
                output.language,
                truncate_code(&output.code, max_dependency_chars)
            );
        }
    }

    let other_files: Vec<String> = plan
        .steps
        .iter()
        .filter(|s| s.id != step.id && !step.dependencies.contains(&s.id))
        .map(|s| format!("- {} ({})", s.file_path, s.step_type))
        .collect();
    if !other_files.is_empty() {
        let _ = writeln!(prompt, "\nOther files in this feature:\n{}", other_files.join("\n"));
    }

    let _ = writeln!(prompt, "\nProject:\n{}", project.describe());
    let _ = write!(
        prompt,
        "\nRespond with **{}** followed by a single ```{} code block.",
        step.file_path,
        project.language_for(step.step_type)
    );

    prompt
}

/// User prompt for a one-off component
pub fn component_prompt(request: &str, file_path: &str, project: &ProjectContext) -> String {
    format!(
        "Create this UI component: {request}\n\
         \n\
         {guidance}\n\
         \n\
         File: {file_path}\n\
         \n\
         Respond with **{file_path}** followed by a single ```{language} code block.",
        request = request.trim(),
        guidance = step_guidance(StepType::Component),
        file_path = file_path,
        language = project.component_extension(),
    )
}

/// User prompt for changing previously generated code
pub fn refine_prompt(previous: &GeneratedCode, instruction: &str) -> String {
    format!(
        "Here is the current version of **{path}**:\n\
         \n\
         ```{language}\n{code}\n```\n\
         \n\
         Change it as follows: {instruction}\n\
         \n\
         Return the complete updated file as **{path}** followed by a single ```{language} code block.",
        path = previous.file_path,
        language = previous.language,
        code = previous.code,
        instruction = instruction.trim(),
    )
}

/// System prompt for answering questions without generating files
pub fn explain_system_prompt(project: &ProjectContext) -> String {
    format!(
        "You are a helpful frontend engineer. Answer questions about React, {} and {} \
         concisely. Include short code snippets only when they help.\n\nProject:\n{}",
        project.styling,
        project.ui_library,
        project.describe()
    )
}
