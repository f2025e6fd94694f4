//! The chat session: owns settings, the conversation and the in-flight flag.
//!
//! Everything that changes settings or the transcript goes through here, so
//! there is exactly one place that persists them.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::ai::{ChatClient, ChatReply};
use crate::config::{Settings, SettingsStore};
use crate::error::{ChatError, Result};
use crate::export::{self, ExportFormat};
use crate::request::{self, ChatRequest};
use crate::state::{now_timestamp, ChatMessage, ChatRole, Conversation};
use crate::transcript::TranscriptStore;

pub struct ChatSession {
    settings: Settings,
    settings_store: SettingsStore,
    conversation: Conversation,
    transcript: Option<TranscriptStore>,
    client: ChatClient,
    /// Id of the user message whose reply is still outstanding.
    pending: Option<String>,
}

impl ChatSession {
    /// Start a session, reading settings once from `settings_store`.
    pub fn new(settings_store: SettingsStore, client: ChatClient) -> Self {
        let settings = settings_store.load_or_default();
        Self {
            settings,
            settings_store,
            conversation: Conversation::new(),
            transcript: None,
            client,
            pending: None,
        }
    }

    /// Keep the conversation in `store`, resuming whatever it already holds.
    pub fn with_transcript(mut self, store: TranscriptStore) -> anyhow::Result<Self> {
        self.conversation = store.load()?;
        self.transcript = Some(store);
        Ok(self)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Validate, persist, then apply. A rejected or unsaved update leaves the
    /// current settings in place.
    pub fn update_settings(&mut self, settings: Settings) -> anyhow::Result<()> {
        settings.validate()?;
        self.settings_store.save(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Check the input, record the user's turn and mark the session busy.
    /// Returns the payload to hand to the transport.
    pub fn begin_submit(&mut self, input: &str) -> Result<ChatRequest> {
        if self.pending.is_some() {
            return Err(ChatError::Busy);
        }
        let request = request::compose(input, &self.settings)?;

        let message = ChatMessage::new(ChatRole::User, input);
        let id = message.id.clone();
        self.conversation.append(message)?;
        self.pending = Some(id);
        self.persist();
        Ok(request)
    }

    /// Settle the in-flight request: append the reply, or roll back the
    /// user's turn so the transcript only shows acknowledged exchanges.
    ///
    /// With nothing in flight (never started, already settled, cancelled or
    /// cleared) the result is dropped and [`ChatError::NotPending`] returned;
    /// the transcript is left alone.
    pub fn finish_submit(&mut self, result: Result<ChatReply>) -> Result<ChatMessage> {
        let Some(pending_id) = self.pending.take() else {
            tracing::debug!(ok = result.is_ok(), "dropping result with no request in flight");
            return Err(ChatError::NotPending);
        };

        let outcome = match result {
            Ok(reply) => {
                let timestamp = reply.timestamp.unwrap_or_else(now_timestamp);
                let message = ChatMessage::with_timestamp(ChatRole::Assistant, reply.content, timestamp);
                self.conversation.append(message.clone()).map(|_| message)
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            if let Some(rolled_back) = self.conversation.remove(&pending_id) {
                tracing::debug!(id = %rolled_back.id, "rolled back unanswered message");
            }
            tracing::warn!("chat request failed: {}", e);
        }
        self.persist();
        outcome
    }

    /// Abandon the in-flight request and drop its user turn. Returns false
    /// when nothing was in flight.
    pub fn cancel_submit(&mut self) -> bool {
        let Some(id) = self.pending.take() else {
            return false;
        };
        self.conversation.remove(&id);
        self.persist();
        true
    }

    /// Send `input` and wait for the reply.
    pub async fn submit(&mut self, input: &str) -> Result<ChatMessage> {
        let request = self.begin_submit(input)?;
        let result = self.client.send(&request).await;
        self.finish_submit(result)
    }

    /// Clear the local transcript, then ask the backend to do the same. The
    /// local clear happens even if the backend call fails; that failure is
    /// still returned so it can be reported.
    pub async fn clear_history(&mut self) -> Result<()> {
        // Any reply still on its way belongs to the cleared conversation.
        self.pending = None;
        self.conversation.clear();
        self.persist();

        self.client.clear_history().await.map_err(|e| {
            tracing::warn!("backend history was not cleared: {}", e);
            e
        })
    }

    /// Write the current conversation into `dir`.
    pub fn export(&self, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
        export::export_to_dir(self.messages(), format, dir, Utc::now())
    }

    fn persist(&self) {
        if let Some(store) = &self.transcript {
            if let Err(e) = store.save(&self.conversation) {
                tracing::warn!("could not save transcript: {:#}", e);
            }
        }
    }
}
