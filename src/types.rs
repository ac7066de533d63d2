//! Shared types used across the chat runtime.

use crate::tools::ToolOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Bot => write!(f, "Bot"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" | "user" => Ok(Self::User),
            "Bot" | "bot" | "assistant" => Ok(Self::Bot),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// One prior message handed to the agent as read-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Tool selection produced from the model's JSON reply.
///
/// `tool == None` means "answer directly". Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCall {
    pub tool: Option<String>,
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    /// The "no tool" selection.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Final answer for one user turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub text: String,
    pub tool_output: Option<ToolOutput>,
}

// ---------------------------------------------------------------------------
// Chat persistence
// ---------------------------------------------------------------------------

/// A chat with its full message list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub id: String,
    pub title: String,
    pub messages: Vec<StoredMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatRecord {
    /// The chat's messages as agent history.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.messages
            .iter()
            .map(|m| ConversationTurn {
                role: m.role,
                text: m.text.clone(),
            })
            .collect()
    }
}

/// A persisted message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<ToolOutput>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_display() {
        for role in [Role::User, Role::Bot] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("System".parse::<Role>().is_err());
    }

    #[test]
    fn chat_history_keeps_order() {
        let now = Utc::now();
        let chat = ChatRecord {
            id: "c1".into(),
            title: "t".into(),
            messages: vec![
                StoredMessage {
                    role: Role::User,
                    text: "hi".into(),
                    tool_output: None,
                    created_at: now,
                },
                StoredMessage {
                    role: Role::Bot,
                    text: "hello".into(),
                    tool_output: None,
                    created_at: now,
                },
            ],
            created_at: now,
            updated_at: now,
        };
        assert_eq!(
            chat.history(),
            vec![ConversationTurn::user("hi"), ConversationTurn::bot("hello")]
        );
    }
}
