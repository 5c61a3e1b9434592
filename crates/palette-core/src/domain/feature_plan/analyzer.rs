//! Request analysis
//!
//! Keyword scoring that turns a free-form feature request into a feature
//! type, a complexity estimate and a feature name.

use serde::Serialize;

use super::step::Complexity;
use super::templates::{FeatureTemplate, FeatureType, TEMPLATES};

const COMPLEX_INDICATORS: &[&str] = &[
    "complete",
    "full",
    "comprehensive",
    "advanced",
    "real-time",
    "realtime",
    "multiple",
    "role-based",
    "analytics",
    "integration",
    "entire",
];

const SIMPLE_INDICATORS: &[&str] = &["simple", "basic", "minimal", "quick", "small", "just", "only"];

const FEATURE_INDICATORS: &[&str] = &[
    "feature", "system", "flow", "module", "page", "app", "section", "complete", "full",
];

const EXPLICIT_MULTI_STEP: &[&str] = &["multi-step", "multi step", "step by step", "full feature"];

const TEST_OPT_OUT: &[&str] = &[
    "no tests",
    "no test",
    "without tests",
    "without testing",
    "skip tests",
    "skip testing",
];

const TEST_OPT_IN: &[&str] = &["test", "tests", "testing", "tested", "spec", "specs"];

/// Words never used in a feature name
const NAME_STOPWORDS: &[&str] = &[
    // verbs and politeness
    "create", "build", "make", "generate", "add", "implement", "write", "design", "develop",
    "need", "want", "give", "please", "can", "could", "would", "you", "i", "me", "us", "we",
    "let's", "lets",
    // articles and determiners
    "a", "an", "the", "some", "my", "our", "your", "new",
    // size and scope words
    "simple", "basic", "minimal", "quick", "small", "just", "only", "complete", "full",
    "comprehensive", "advanced", "entire", "nice", "modern", "beautiful", "responsive",
    // generic UI nouns
    "component", "components", "ui", "feature", "features", "functionality", "system",
    "module", "flow", "multi-step", "react", "tailwind", "shadcn",
];

/// Words that end the name phrase once something has been collected
const NAME_CONNECTORS: &[&str] = &[
    "with", "for", "that", "which", "using", "including", "where", "to", "and", "of", "in",
    "on", "from", "so",
];

const DEFAULT_FEATURE_NAME: &str = "Feature";

/// Result of analysing one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestAnalysis {
    pub feature_type: FeatureType,
    /// Number of keywords of `feature_type` found in the request
    pub score: usize,
    pub complexity: Complexity,
    pub wants_tests: Option<bool>,
    pub feature_name: String,
    pub is_multi_step: bool,
}

/// Run every analysis pass over `request`
pub fn analyze(request: &str) -> RequestAnalysis {
    let (feature_type, score) = classify(request);
    RequestAnalysis {
        feature_type,
        score,
        complexity: estimate_complexity(request),
        wants_tests: wants_tests(request),
        feature_name: extract_feature_name(request),
        is_multi_step: is_multi_step_request(request),
    }
}

/// Lowercased words; hyphens inside words are kept
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|t| t.trim_matches(|c| c == '-' || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Request text matcher for single words and multi-word phrases
struct Matcher {
    tokens: Vec<String>,
    padded: String,
}

impl Matcher {
    fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let padded = format!(" {} ", tokens.join(" "));
        Self { tokens, padded }
    }

    fn contains(&self, keyword: &str) -> bool {
        if keyword.contains(' ') {
            self.padded.contains(&format!(" {} ", keyword))
        } else {
            self.tokens.iter().any(|t| t == keyword)
        }
    }

    fn count(&self, keywords: &[&str]) -> usize {
        keywords.iter().filter(|k| self.contains(k)).count()
    }
}

fn score_template(matcher: &Matcher, template: &FeatureTemplate) -> usize {
    matcher.count(template.keywords)
}

/// Best matching feature type and its keyword score
///
/// Ties go to the template declared first; a score of zero means `custom`.
pub fn classify(request: &str) -> (FeatureType, usize) {
    let matcher = Matcher::new(request);

    let mut best = (FeatureType::Custom, 0);
    for template in TEMPLATES {
        let score = score_template(&matcher, template);
        if score > best.1 {
            best = (template.feature_type, score);
        }
    }
    best
}

/// Complexity from indicator words and request length
pub fn estimate_complexity(request: &str) -> Complexity {
    let matcher = Matcher::new(request);

    let mut score = 2 * matcher.count(COMPLEX_INDICATORS) as i32;
    score -= 2 * matcher.count(SIMPLE_INDICATORS) as i32;

    let words = matcher.tokens.len();
    if words > 20 {
        score += 1;
    }
    if words > 40 {
        score += 1;
    }

    if score >= 3 {
        Complexity::Complex
    } else if score <= -1 {
        Complexity::Simple
    } else {
        Complexity::Moderate
    }
}

/// Explicit request for or against tests; opting out wins
pub fn wants_tests(request: &str) -> Option<bool> {
    let matcher = Matcher::new(request);

    if TEST_OPT_OUT.iter().any(|p| matcher.contains(p)) {
        Some(false)
    } else if TEST_OPT_IN.iter().any(|w| matcher.contains(w)) {
        Some(true)
    } else {
        None
    }
}

/// Whether the request describes a feature that needs several files
pub fn is_multi_step_request(request: &str) -> bool {
    let matcher = Matcher::new(request);

    if EXPLICIT_MULTI_STEP.iter().any(|p| matcher.contains(p)) {
        return true;
    }

    let (_, score) = classify(request);
    score >= 2 || (score >= 1 && matcher.count(FEATURE_INDICATORS) > 0)
}

/// PascalCase name from the first meaningful words of the request
pub fn extract_feature_name(request: &str) -> String {
    let mut words: Vec<String> = Vec::new();

    for token in tokenize(request) {
        if NAME_CONNECTORS.contains(&token.as_str()) {
            if words.is_empty() {
                continue;
            }
            break;
        }
        if NAME_STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        words.push(token);
        if words.len() == 3 {
            break;
        }
    }

    if words.is_empty() {
        return DEFAULT_FEATURE_NAME.to_string();
    }

    words.iter().map(|w| pascal_case(w)).collect()
}

/// `e-commerce` -> `ECommerce`, `login` -> `Login`
pub(crate) fn pascal_case(word: &str) -> String {
    word.split(|c: char| c == '-' || c == '_' || c == '\'' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `UserProfile` -> `userProfile`
pub(crate) fn camel_case(pascal: &str) -> String {
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `UserProfile` -> `user-profile`
pub(crate) fn kebab_case(pascal: &str) -> String {
    let mut out = String::new();
    for (i, c) in pascal.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
