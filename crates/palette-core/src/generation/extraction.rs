//! Code block extraction
//!
//! Pulls fenced code blocks (and the file path announced before each one)
//! out of model responses.

/// A fenced code block from a model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Fence language, `txt` when the fence has none
    pub language: String,
    pub code: String,
    /// Path announced on the line(s) before the fence, if any
    pub path: Option<String>,
}

impl CodeBlock {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// JavaScript or TypeScript, with or without JSX
    pub fn is_script(&self) -> bool {
        is_script_language(&self.language)
    }

    pub fn extension(&self) -> &'static str {
        language_to_extension(&self.language)
    }
}

/// Extract every non-empty fenced block from markdown text
pub fn extract_code_blocks(content: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut in_block = false;
    let mut current_language = String::new();
    let mut current_code = String::new();
    let mut pending_path: Option<String> = None;
    let mut block_path: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            if in_block {
                if !current_code.trim().is_empty() {
                    let mut block =
                        CodeBlock::new(current_language.clone(), current_code.trim_end().to_string());
                    block.path = block_path.take();
                    blocks.push(block);
                }
                current_language.clear();
                current_code.clear();
                block_path = None;
                in_block = false;
            } else {
                current_language = trimmed
                    .trim_start_matches('`')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_lowercase();
                if current_language.is_empty() {
                    current_language = "txt".to_string();
                }
                block_path = pending_path.take();
                in_block = true;
            }
        } else if in_block {
            current_code.push_str(line);
            current_code.push('\n');
        } else if let Some(path) = extract_file_path(line) {
            pending_path = Some(path);
        }
    }

    blocks
}

/// Preferred block for a single-file answer: the first JS/TS block,
/// otherwise the first block
pub fn select_code_block(blocks: &[CodeBlock]) -> Option<&CodeBlock> {
    blocks
        .iter()
        .find(|b| b.is_script())
        .or_else(|| blocks.first())
}

pub fn is_script_language(language: &str) -> bool {
    matches!(
        language.to_lowercase().as_str(),
        "tsx" | "ts" | "typescript" | "jsx" | "js" | "javascript" | "typescriptreact" | "javascriptreact"
    )
}

/// File extension for a fence language
pub fn language_to_extension(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "tsx" | "typescriptreact" => "tsx",
        "ts" | "typescript" => "ts",
        "jsx" | "javascriptreact" => "jsx",
        "js" | "javascript" => "js",
        "css" => "css",
        "scss" => "scss",
        "json" => "json",
        "html" => "html",
        "md" | "markdown" => "md",
        "bash" | "sh" | "shell" => "sh",
        _ => "txt",
    }
}

/// File path from a marker line: `` `path` ``, `**path**`, `### path`, `File: path`
/// or a `// path` comment
pub fn extract_file_path(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("```") {
        return None;
    }

    let candidate = if line.starts_with("**") && line.ends_with("**") && line.len() > 4 {
        line.trim_start_matches("**").trim_end_matches("**")
    } else if line.starts_with('#') {
        line.trim_start_matches('#')
    } else if let Some(rest) = line.strip_prefix("//") {
        rest
    } else if let Some(rest) = ["File:", "Filename:", "Path:"]
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
    {
        rest
    } else {
        line
    };

    let path = candidate.trim().trim_end_matches(':').trim_matches('`').trim();
    looks_like_path(path).then(|| path.to_string())
}

/// Whether a string looks like a frontend source path
pub fn looks_like_path(s: &str) -> bool {
    if s.is_empty() || s.contains(char::is_whitespace) {
        return false;
    }

    const EXTENSIONS: [&str; 11] = [
        "tsx", "ts", "jsx", "js", "mjs", "css", "scss", "json", "html", "md", "mdx",
    ];

    match s.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        }
        None => false,
    }
}
