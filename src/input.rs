//! Inbound message events
//!
//! The listener collaborator pushes one `MessageEvent` per incoming message
//! onto a channel. On the command line they arrive as JSON lines on stdin.

use serde::{Deserialize, Serialize};

/// Longest text kept in log summaries, in characters
const SUMMARY_CHARS: usize = 100;

/// A message observed on the personal account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Chat or channel the message arrived in
    pub chat_id: i64,

    /// Message id within the chat, when the listener provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,

    /// Author of the message, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,

    /// Message body
    #[serde(default, alias = "message")]
    pub text: String,

    /// Sent by this account rather than received
    #[serde(default)]
    pub outgoing: bool,
}

impl MessageEvent {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id: None,
            sender_id: None,
            text: text.into(),
            outgoing: false,
        }
    }

    pub fn from_sender(mut self, sender_id: i64) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn outgoing(mut self) -> Self {
        self.outgoing = true;
        self
    }

    /// Parse an event from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Short form of the text for logging
    pub fn summary(&self) -> String {
        let mut chars = self.text.chars();
        let truncated: String = chars.by_ref().take(SUMMARY_CHARS).collect();
        if chars.next().is_some() {
            format!("{}...", truncated)
        } else {
            truncated
        }
    }
}
