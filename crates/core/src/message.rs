//! Chat message and conversation value objects.
//!
//! These carry the prior dialogue between the user and the assistant.
//! The reasoning loop itself never mutates a conversation — front ends
//! append exchanges and pass a rendered block of recent turns into each
//! run as grounding context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An ordered sequence of messages with shared context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: String,

    /// Ordered messages
    pub messages: Vec<ChatMessage>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: ChatMessage) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Render the most recent turns as a prior-conversation block for the
    /// model prompt. A turn is one user/assistant exchange, so up to
    /// `max_turns * 2` trailing messages are included; system messages are
    /// skipped. Returns an empty string for an empty conversation.
    pub fn render_recent(&self, max_turns: usize) -> String {
        let dialogue: Vec<&ChatMessage> = self
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();

        let start = dialogue.len().saturating_sub(max_turns * 2);
        dialogue[start..]
            .iter()
            .map(|m| {
                let label = match m.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                    Role::System => unreachable!("system messages filtered above"),
                };
                format!("{}: {}", label, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = ChatMessage::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, agent!");
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new();
        let created = conv.created_at;

        conv.push(ChatMessage::user("First message"));
        assert_eq!(conv.messages.len(), 1);
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn render_recent_limits_turns() {
        let mut conv = Conversation::new();
        for i in 0..4 {
            conv.push(ChatMessage::user(format!("question {i}")));
            conv.push(ChatMessage::assistant(format!("answer {i}")));
        }

        let block = conv.render_recent(2);
        assert!(!block.contains("question 0"));
        assert!(!block.contains("question 1"));
        assert!(block.contains("User: question 2"));
        assert!(block.contains("Assistant: answer 3"));
    }

    #[test]
    fn render_recent_skips_system_messages() {
        let mut conv = Conversation::new();
        conv.push(ChatMessage::system("identity prompt"));
        conv.push(ChatMessage::user("hi"));

        let block = conv.render_recent(5);
        assert!(!block.contains("identity prompt"));
        assert_eq!(block, "User: hi");
    }

    #[test]
    fn render_recent_empty_conversation() {
        let conv = Conversation::new();
        assert!(conv.render_recent(5).is_empty());
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = ChatMessage::assistant("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test message");
        assert_eq!(deserialized.role, Role::Assistant);
    }
}
