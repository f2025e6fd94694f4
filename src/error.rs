use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyInput,

    #[error("a request is already in flight")]
    Busy,

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("HTTP error! status: {0}")]
    Http(u16),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("duplicate message id: {0}")]
    DuplicateId(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("no request is in flight")]
    NotPending,
}

impl ChatError {
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    pub fn invalid_setting(message: impl Into<String>) -> Self {
        Self::InvalidSetting(message.into())
    }

    /// Short notice suitable for showing to the person at the terminal.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::EmptyInput => "Type a message first.".to_string(),
            ChatError::Busy => "Still waiting for the previous reply.".to_string(),
            ChatError::Timeout(_) => "Request timed out. Please try again.".to_string(),
            ChatError::Transport(msg) if msg.contains("API key") => {
                "Invalid API key. Please check your configuration.".to_string()
            }
            ChatError::Http(_) | ChatError::Transport(_) => {
                "Failed to send message. Please try again.".to_string()
            }
            ChatError::Export(_) => "Failed to export chat. Please try again.".to_string(),
            ChatError::DuplicateId(_) | ChatError::InvalidSetting(_) | ChatError::NotPending => {
                self.to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ChatError::Http(status.as_u16()),
            None => ChatError::Transport(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
