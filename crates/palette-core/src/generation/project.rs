//! Target project description
//!
//! Supplied through configuration; nothing here reads the target project.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::feature_plan::StepType;

/// Frontend framework of the target project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    React,
    NextJs,
    Vite,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::React => write!(f, "react"),
            Self::NextJs => write!(f, "nextjs"),
            Self::Vite => write!(f, "vite"),
        }
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "react" | "cra" => Ok(Self::React),
            "nextjs" | "next" | "next.js" => Ok(Self::NextJs),
            "vite" => Ok(Self::Vite),
            other => Err(format!(
                "Unknown framework '{}'. Supported frameworks: react, nextjs, vite",
                other
            )),
        }
    }
}

/// What prompts and file paths need to know about the target project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectContext {
    pub framework: Framework,
    pub typescript: bool,
    pub styling: String,
    pub ui_library: String,
    pub components_dir: String,
    pub hooks_dir: String,
    pub utils_dir: String,
    /// `app` router directory for Next.js projects
    pub pages_dir: String,
    pub tests_dir: String,
    /// shadcn/ui components known to be installed
    pub available_components: Vec<String>,
}

impl Default for ProjectContext {
    fn default() -> Self {
        Self {
            framework: Framework::React,
            typescript: true,
            styling: "tailwind".to_string(),
            ui_library: "shadcn".to_string(),
            components_dir: "src/components".to_string(),
            hooks_dir: "src/hooks".to_string(),
            utils_dir: "src/lib".to_string(),
            pages_dir: "src/pages".to_string(),
            tests_dir: "src/__tests__".to_string(),
            available_components: Vec::new(),
        }
    }
}

impl ProjectContext {
    /// Extension for files containing JSX
    pub fn component_extension(&self) -> &'static str {
        if self.typescript { "tsx" } else { "jsx" }
    }

    /// Extension for plain modules
    pub fn module_extension(&self) -> &'static str {
        if self.typescript { "ts" } else { "js" }
    }

    /// Fence language the model is asked to answer in
    pub fn language_for(&self, step_type: StepType) -> &'static str {
        match step_type {
            StepType::Hook | StepType::Util => self.module_extension(),
            _ => self.component_extension(),
        }
    }

    /// Output path for an artifact, relative to the output root
    pub fn file_path_for(&self, step_type: StepType, name: &str, feature_slug: &str) -> String {
        let jsx = self.component_extension();
        let module = self.module_extension();

        match step_type {
            StepType::Component => {
                format!("{}/{}/{}.{}", self.components_dir, feature_slug, name, jsx)
            }
            StepType::Hook => format!("{}/{}.{}", self.hooks_dir, name, module),
            StepType::Util => format!("{}/{}.{}", self.utils_dir, name, module),
            StepType::Page => match self.framework {
                Framework::NextJs => {
                    format!("{}/{}/page.{}", self.pages_dir, slugify(name), jsx)
                }
                _ => format!("{}/{}Page.{}", self.pages_dir, name, jsx),
            },
            StepType::Test => format!("{}/{}.test.{}", self.tests_dir, name, jsx),
        }
    }

    /// Context block included in prompts
    pub fn describe(&self) -> String {
        let mut lines = vec![
            format!("- Framework: {}", self.framework_label()),
            format!(
                "- Language: {}",
                if self.typescript { "TypeScript" } else { "JavaScript" }
            ),
            format!("- Styling: {}", self.styling),
            format!("- UI library: {}", self.ui_library),
            format!(
                "- Import aliases: components from \"@/{}\", hooks from \"@/{}\", utilities from \"@/{}\"",
                strip_src(&self.components_dir),
                strip_src(&self.hooks_dir),
                strip_src(&self.utils_dir)
            ),
        ];
        if self.available_components.is_empty() {
            lines.push(format!(
                "- Installed {} components: none recorded, prefer the standard set",
                self.ui_library
            ));
        } else {
            lines.push(format!(
                "- Installed {} components: {}",
                self.ui_library,
                self.available_components.join(", ")
            ));
        }
        lines.join("\n")
    }

    fn framework_label(&self) -> &'static str {
        match self.framework {
            Framework::React => "React",
            Framework::NextJs => "Next.js (App Router, add \"use client\" to interactive components)",
            Framework::Vite => "React (Vite)",
        }
    }
}

fn strip_src(dir: &str) -> &str {
    dir.strip_prefix("src/").unwrap_or(dir)
}

/// `ProductCatalog` -> `product-catalog`
fn slugify(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
