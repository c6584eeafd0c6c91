//! Conversation turn and state types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::llm::{Message, MessageRole};
use crate::order::OrderRecord;

/// One message in a conversation, attributed to user, assistant, or system.
///
/// Fields are private: a turn never changes after it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: MessageRole,
    content: String,
}

impl Turn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Where a user's conversation stands in the order lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// No active order.
    #[default]
    Idle,
    /// Turns exchanged, no completed order seen yet.
    Collecting,
    /// An order was extracted and is waiting to be persisted.
    Completed,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationState::Idle => write!(f, "idle"),
            ConversationState::Collecting => write!(f, "collecting"),
            ConversationState::Completed => write!(f, "completed"),
        }
    }
}

/// Read-only copy of a conversation, used by the API and the local REPL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub user_id: String,
    pub state: ConversationState,
    pub turns: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_order: Option<OrderRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        assert_eq!(Turn::user("hi").role(), MessageRole::User);
        assert_eq!(Turn::assistant("hello").role(), MessageRole::Assistant);
        assert_eq!(Turn::system("rules").content(), "rules");
    }

    #[test]
    fn test_turn_into_message() {
        let turn = Turn::user("I'd like a pizza");
        let message = Message::from(&turn);
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.content, "I'd like a pizza");
    }

    #[test]
    fn test_state_default_is_idle() {
        assert_eq!(ConversationState::default(), ConversationState::Idle);
        assert_eq!(ConversationState::Completed.to_string(), "completed");
    }
}
