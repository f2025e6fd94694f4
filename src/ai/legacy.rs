use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::ai::chat::DEFAULT_TIMEOUT;
use crate::error::{ChatError, Result};
use crate::request::LegacyAskRequest;

pub const DEFAULT_LEGACY_URL: &str = "http://localhost:5000";

/// Text shown when the legacy backend answers without a `response` field.
pub const FALLBACK_REPLY: &str = "Desculpe, ocorreu um erro ao processar sua solicitação.";

#[derive(Deserialize)]
struct AskResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the first-generation `/ask` endpoint.
#[derive(Clone)]
pub struct LegacyClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl LegacyClient {
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

    pub async fn ask(&self, request: &LegacyAskRequest) -> Result<String> {
        let url = format!("{}/ask", self.base_url);
        tracing::debug!(%url, provider = request.api_provider, model = %request.model, "sending ask request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let body: AskResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(self.map_error(e)),
            Err(_) => return Err(ChatError::Http(status.as_u16())),
        };

        if !status.is_success() {
            tracing::warn!(
                %url,
                %status,
                error = body.error.as_deref().unwrap_or("<none>"),
                "ask request rejected"
            );
            return Err(ChatError::Http(status.as_u16()));
        }

        Ok(body.response.unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }

    fn map_error(&self, e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::Timeout(self.timeout)
        } else {
            ChatError::from(e)
        }
    }
}
