//! Interactive terminal chat on top of the iron-llama library.
//!
//! This module provides a streaming REPL chat interface. It supports:
//!
//! - Streaming replies with real-time token display
//! - Slash commands for switching models and inspecting the session
//! - Configurable settings sources, model and output styling
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and resolved options
//! - [`session`]: Conversation state and the streamed turn
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, ChatInput, classify_input, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ChatSession, SessionStats};

/// Title shown when the chat starts.
pub const TITLE: &str = "Iron-llama";

/// Caption shown under the title.
pub const CAPTION: &str = "Let's go back in to future...";
