//! Conversation-driven generation
//!
//! Intent detection, the plan confirmation/execution state machine and the
//! conversation history.

pub mod engine;
pub mod history;
pub mod intent;

pub use engine::{ConversationEngine, EnginePhase, EngineReply, ExecutionMode, HELP_TEXT, ReplyKind};
pub use history::{ConversationHistory, ConversationTurn, HISTORY_VERSION};
pub use intent::{Intent, classify_intent};
