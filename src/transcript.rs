//! Conversation transcript types.
//!
//! The transcript is an append-only, ordered history owned exclusively by the
//! chat session. Tool-call payloads from the model are mapped to these tagged
//! types at the boundary so nothing downstream depends on loose JSON shapes.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Append-only conversation history. Turns can be added but never edited or
/// removed, so ordering is monotonic for the lifetime of a session.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content);
    }

    pub fn push_model(&mut self, content: impl Into<String>) {
        self.push(Role::Model, content);
    }

    pub fn push_tool(&mut self, content: impl Into<String>) {
        self.push(Role::Tool, content);
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            content: content.into(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
