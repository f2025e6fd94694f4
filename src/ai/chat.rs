use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ChatError, Result};
use crate::request::ChatRequest;

/// How long a chat request may run before it is abandoned.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Reply from `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one message and wait for the full reply. No retries; a failed
    /// request is resubmitted by the user.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!(%url, model = request.config.model.as_str(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "chat request rejected");
            return Err(ChatError::Http(status.as_u16()));
        }

        let reply: ChatReply = response.json().await.map_err(|e| self.map_error(e))?;
        tracing::debug!(chars = reply.content.len(), "chat reply received");
        Ok(reply)
    }

    /// Ask the backend to forget its side of the conversation.
    pub async fn clear_history(&self) -> Result<()> {
        let url = format!("{}/api/clear", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            tracing::warn!(%url, status = %response.status(), "clear request rejected");
            return Err(ChatError::Http(response.status().as_u16()));
        }
        Ok(())
    }

    fn map_error(&self, e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            tracing::warn!(timeout = ?self.timeout, "request timed out");
            ChatError::Timeout(self.timeout)
        } else {
            ChatError::from(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_timestamp_is_optional() {
        let reply: ChatReply = serde_json::from_str(r#"{"content":"hello"}"#).unwrap();
        assert_eq!(reply.content, "hello");
        assert_eq!(reply.timestamp, None);

        let reply: ChatReply =
            serde_json::from_str(r#"{"content":"x","timestamp":"2024-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(reply.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = ChatClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }
}
