//! Conversation history
//!
//! Turns are kept in memory and can be exported to (and restored from) a
//! versioned JSON document.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::llm::{Message, MessageRole};

use super::intent::Intent;

/// Current export format version
pub const HISTORY_VERSION: u32 = 1;

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Detected intent, for user turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: MessageRole, content: impl Into<String>, intent: Option<Intent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            intent,
            created_at: Utc::now(),
        }
    }

    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryExport {
    version: u32,
    exported_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
}

/// Ordered list of conversation turns
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn push_user(&mut self, content: impl Into<String>, intent: Intent) {
        self.push(ConversationTurn::new(MessageRole::User, content, Some(intent)));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ConversationTurn::new(MessageRole::Assistant, content, None));
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// The last `n` turns as LLM messages
    pub fn recent_messages(&self, n: usize) -> Vec<Message> {
        self.recent(n).iter().map(ConversationTurn::to_message).collect()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        let export = HistoryExport {
            version: HISTORY_VERSION,
            exported_at: Utc::now(),
            turns: self.turns.clone(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let export: HistoryExport = serde_json::from_str(json)
            .map_err(|e| Error::HistoryError(format!("invalid history file: {}", e)))?;
        if export.version > HISTORY_VERSION {
            return Err(Error::HistoryError(format!(
                "history version {} is newer than supported version {}",
                export.version, HISTORY_VERSION
            )));
        }
        Ok(Self {
            turns: export.turns,
        })
    }

    /// Write the history to `path`, creating parent directories
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), turns = self.turns.len(), "Saved conversation history");
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let history = Self::from_json(&content)?;
        debug!(path = %path.display(), turns = history.len(), "Loaded conversation history");
        Ok(history)
    }
}
