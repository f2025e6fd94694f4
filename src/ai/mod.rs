pub mod chat;
pub mod legacy;

pub use chat::{ChatClient, ChatReply};
pub use legacy::LegacyClient;
