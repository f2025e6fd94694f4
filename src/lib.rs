pub mod ai;
pub mod config;
pub mod error;
pub mod export;
pub mod provider;
pub mod render;
pub mod repl;
pub mod request;
pub mod session;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use ai::{ChatClient, ChatReply, LegacyClient};
pub use config::{CodeTheme, Settings, SettingsStore};
pub use error::ChatError;
pub use export::ExportFormat;
pub use provider::ApiProvider;
pub use render::Renderer;
pub use request::{ChatRequest, LegacyAskRequest};
pub use session::ChatSession;
pub use state::{ChatMessage, ChatRole, Conversation};
pub use transcript::TranscriptStore;
