//! Record types exchanged with the chat-history collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of the synthetic notice appended when the channel drops.
pub const DISCONNECT_NOTICE: &str = "connection closed";

/// Author of a chat message.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user driving the session
    User,
    /// Remote assistant
    Assistant,
    /// Synthetic notices
    System,
}

/// A single message inside a chat exchange.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub role: Role,
    pub create_time: DateTime<Utc>,
}

impl ChatMessage {
    #[must_use]
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Self {
            content: content.into(),
            role,
            create_time: Utc::now(),
        }
    }
}

/// Record appended to the chat history, optionally flagged as an error entry.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRecord {
    pub message: ChatMessage,
    /// Error marker; set on synthetic failure notices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatRecord {
    #[must_use]
    pub fn new(message: ChatMessage) -> Self {
        Self {
            message,
            error: None,
        }
    }

    /// The assistant-role error record appended to history when the channel
    /// closes.
    #[must_use]
    pub fn disconnect_notice() -> Self {
        Self {
            message: ChatMessage::new(Role::Assistant, DISCONNECT_NOTICE),
            error: Some("error".to_owned()),
        }
    }
}
