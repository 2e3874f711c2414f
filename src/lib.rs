// Public modules
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod model_selector;
pub mod observability;
pub mod provider;
pub mod request;
pub mod sse;
pub mod stream_adapter;
pub mod transcript;
pub mod types;

// Re-exports
pub use client::Groq;
pub use config::{ApiKey, ConfigLoader, ConfigSource, Configuration};
pub use error::{Error, Result};
pub use model_selector::{ModelSelector, SELECTOR_TITLE};
pub use observability::register_biometrics;
pub use provider::{ChunkStream, CompletionProvider};
pub use request::{assemble_messages, build_request};
pub use stream_adapter::{collect_reply, text_fragments};
pub use transcript::{Role, Transcript, Turn};
pub use types::*;
