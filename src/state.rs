//! UI-agnostic conversation state
//!
//! Messages and the in-memory conversation they live in. Nothing here touches
//! the network or the filesystem; the session controller and the transcript
//! store build on top of it.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: String,
    pub id: String,
}

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    /// Speaker label used in transcripts and exports.
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::Assistant => "Assistant",
            ChatRole::User | ChatRole::System => "You",
        }
    }
}

impl ChatMessage {
    /// New message stamped with the current time and a fresh id.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self::with_timestamp(role, content, now_timestamp())
    }

    pub fn with_timestamp(
        role: ChatRole,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: timestamp.into(),
            id: new_message_id(),
        }
    }
}

/// Random message id. Never derived from the clock, so rapid submissions
/// cannot collide.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Ordered, append-only list of messages.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a conversation from stored messages, rejecting repeated ids.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Result<Self> {
        let mut conversation = Self::new();
        for message in messages {
            conversation.append(message)?;
        }
        Ok(conversation)
    }

    pub fn append(&mut self, message: ChatMessage) -> Result<()> {
        if self.messages.iter().any(|m| m.id == message.id) {
            return Err(ChatError::DuplicateId(message.id));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Drop the message with `id`, if it is still here. Used to roll back
    /// an optimistic user turn whose request failed.
    pub fn remove(&mut self, id: &str) -> Option<ChatMessage> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
