//! Intent detection
//!
//! Keyword rules that depend on the engine phase: "yes" only means
//! something while a plan waits for confirmation, "next" only while one is
//! executing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::feature_plan::analyzer::tokenize;
use crate::domain::feature_plan::is_multi_step_request;

use super::engine::EnginePhase;

/// What the user wants from a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Confirm,
    Cancel,
    NextStep,
    Status,
    Help,
    Refine,
    Explain,
    MultiStepFeature,
    GenerateComponent,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::NextStep => "next_step",
            Self::Status => "status",
            Self::Help => "help",
            Self::Refine => "refine",
            Self::Explain => "explain",
            Self::MultiStepFeature => "multi_step_feature",
            Self::GenerateComponent => "generate_component",
        };
        write!(f, "{}", name)
    }
}

const CONFIRM_WORDS: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "ok", "okay", "go", "proceed", "confirm", "sure", "start",
    "lgtm",
];
const CONFIRM_PHRASES: &[&str] = &["do it", "go ahead", "sounds good", "looks good", "build it"];

const CANCEL_WORDS: &[&str] = &["no", "nope", "n", "cancel", "stop", "abort", "quit", "nevermind"];
const CANCEL_PHRASES: &[&str] = &["never mind", "forget it"];

const NEXT_WORDS: &[&str] = &["next", "continue", "proceed", "go"];
const NEXT_PHRASES: &[&str] = &["go on", "keep going", "next step"];

const STATUS_WORDS: &[&str] = &["status", "progress"];

const REFINE_OPENERS: &[&str] = &["change", "update", "modify", "tweak", "adjust", "rename", "remove"];
const REFINE_PHRASES: &[&str] = &["make it", "make the", "instead", "to it", "to the component"];

const QUESTION_OPENERS: &[&str] = &[
    "what", "why", "how", "when", "where", "which", "who", "is", "are", "does", "do", "should",
    "explain",
];

const GENERATION_VERBS: &[&str] = &[
    "create", "build", "make", "generate", "add", "implement", "write", "design",
];

/// Messages longer than this are never read as a bare command
const COMMAND_MAX_WORDS: usize = 5;

struct Words {
    tokens: Vec<String>,
    padded: String,
}

impl Words {
    fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let padded = format!(" {} ", tokens.join(" "));
        Self { tokens, padded }
    }

    fn any_word(&self, words: &[&str]) -> bool {
        self.tokens.iter().any(|t| words.contains(&t.as_str()))
    }

    fn any_phrase(&self, phrases: &[&str]) -> bool {
        phrases
            .iter()
            .any(|p| self.padded.contains(&format!(" {} ", p)))
    }

    fn first(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    fn is_command(&self) -> bool {
        !self.tokens.is_empty() && self.tokens.len() <= COMMAND_MAX_WORDS
    }
}

/// Classify `input` for the current phase
///
/// `has_component` says whether there is a previously generated component
/// to refine.
pub fn classify_intent(input: &str, phase: EnginePhase, has_component: bool) -> Intent {
    let words = Words::new(input);
    let trimmed = input.trim();

    if trimmed == "?" {
        return Intent::Help;
    }
    if words.is_command() {
        if words.first() == Some("help") {
            return Intent::Help;
        }
        if words.any_word(STATUS_WORDS) {
            return Intent::Status;
        }
    }

    match phase {
        EnginePhase::AwaitingConfirmation if words.is_command() => {
            if words.any_word(CANCEL_WORDS) || words.any_phrase(CANCEL_PHRASES) {
                return Intent::Cancel;
            }
            if words.any_word(CONFIRM_WORDS) || words.any_phrase(CONFIRM_PHRASES) {
                return Intent::Confirm;
            }
        }
        EnginePhase::Executing if words.is_command() => {
            if words.any_word(CANCEL_WORDS) || words.any_phrase(CANCEL_PHRASES) {
                return Intent::Cancel;
            }
            if words.any_word(NEXT_WORDS) || words.any_phrase(NEXT_PHRASES) {
                return Intent::NextStep;
            }
        }
        _ => {}
    }

    if has_component && is_refinement(&words) {
        return Intent::Refine;
    }

    if is_question(&words, trimmed) {
        return Intent::Explain;
    }

    if is_multi_step_request(input) {
        Intent::MultiStepFeature
    } else {
        Intent::GenerateComponent
    }
}

fn is_refinement(words: &Words) -> bool {
    words
        .first()
        .is_some_and(|first| REFINE_OPENERS.contains(&first))
        || words.any_phrase(REFINE_PHRASES)
}

fn is_question(words: &Words, raw: &str) -> bool {
    if words.first() == Some("explain") {
        return true;
    }
    let asks = raw.ends_with('?')
        || words
            .first()
            .is_some_and(|first| QUESTION_OPENERS.contains(&first));
    asks && !words.any_word(GENERATION_VERBS)
}
