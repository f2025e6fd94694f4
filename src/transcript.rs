use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::state::{ChatMessage, Conversation};

/// Keeps the conversation on disk between runs, as a JSON array of messages.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    path: PathBuf,
}

impl TranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("devchat").join("transcript.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved conversation; empty when nothing has been saved.
    pub fn load(&self) -> Result<Conversation> {
        if !self.path.exists() {
            return Ok(Conversation::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let messages: Vec<ChatMessage> = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Conversation::from_messages(messages)?)
    }

    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(conversation.messages())?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;

    #[test]
    fn missing_file_is_an_empty_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().join("transcript.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().join("a").join("transcript.json"));

        let mut conversation = Conversation::new();
        conversation.append(ChatMessage::new(ChatRole::User, "hello")).unwrap();
        conversation.append(ChatMessage::new(ChatRole::Assistant, "hi there")).unwrap();
        store.save(&conversation).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.messages(), conversation.messages());
    }

    #[test]
    fn repeated_ids_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");
        let message = ChatMessage::new(ChatRole::User, "dup");
        fs::write(&path, serde_json::to_string(&vec![message.clone(), message]).unwrap()).unwrap();

        assert!(TranscriptStore::new(&path).load().is_err());
    }
}
