//! Outbound payloads for the chat and legacy ask endpoints.

use serde::Serialize;

use crate::config::{Language, ModelType, Settings};
use crate::error::{ChatError, Result};
use crate::provider::ApiProvider;

/// Token limit the legacy backend assumes when none is configured.
pub const LEGACY_DEFAULT_MAX_TOKENS: u32 = 1500;

/// Generation parameters sent alongside each chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatConfig {
    pub model: ModelType,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: Option<u32>,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub stream: bool,
    pub language: Language,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub config: ChatConfig,
}

/// Body of the legacy `POST /ask`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyAskRequest {
    pub message: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub model: String,
    pub api_provider: &'static str,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

/// Build a chat request. The text is sent as typed; it only has to contain
/// something other than whitespace.
pub fn compose(text: &str, settings: &Settings) -> Result<ChatRequest> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyInput);
    }

    Ok(ChatRequest {
        message: text.to_string(),
        config: ChatConfig {
            model: settings.model,
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
            stream: settings.stream,
            language: settings.language,
        },
    })
}

/// Build a legacy ask request. The legacy client trims the message.
pub fn compose_legacy(
    text: &str,
    settings: &Settings,
    provider: ApiProvider,
    model: Option<&str>,
) -> Result<LegacyAskRequest> {
    let message = text.trim();
    if message.is_empty() {
        return Err(ChatError::EmptyInput);
    }

    Ok(LegacyAskRequest {
        message: message.to_string(),
        max_tokens: settings.max_tokens.unwrap_or(LEGACY_DEFAULT_MAX_TOKENS),
        temperature: settings.temperature,
        model: model.unwrap_or(provider.default_model()).to_string(),
        api_provider: provider.as_str(),
        top_p: settings.top_p,
        frequency_penalty: settings.frequency_penalty,
        presence_penalty: settings.presence_penalty,
    })
}
