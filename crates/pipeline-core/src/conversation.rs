//! Genie conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    /// Injected by the pipeline (inbound tool-routed message), as opposed
    /// to typed by the user.
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Conversation memory owned exclusively by one genie node. Mutated only by
/// the genie engine; lives until the node is deleted or the pipeline
/// cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenieConversation {
    pub messages: Vec<ConversationMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl GenieConversation {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.messages.push(ConversationMessage::new(role, content));
        self.last_updated = Some(Utc::now());
    }
}
