//! Canonical type definitions for the core domain
//!
//! Conversation turns as the session keeps them. The agent layer converts
//! these into gateway messages; the CLI renders them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn in the session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether two turns carry the same role and text, ignoring timestamps
    pub fn same_turn(&self, other: &ChatMessage) -> bool {
        self.role == other.role && self.content == other.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::user("수원시 노인 인구");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "수원시 노인 인구");
    }

    #[test]
    fn test_same_turn_ignores_timestamp() {
        let a = ChatMessage::assistant("hello");
        let mut b = ChatMessage::assistant("hello");
        b.timestamp = a.timestamp + chrono::Duration::seconds(30);
        assert!(a.same_turn(&b));
        assert!(!a.same_turn(&ChatMessage::user("hello")));
    }
}
