//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

use crate::types::ModelId;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Switch the model used for subsequent turns.
    Model(ModelId),

    /// List the selectable models.
    Models,

    /// Re-render the transcript.
    History,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use iron_llama::chat::{ChatCommand, parse_command};
/// # use iron_llama::ModelId;
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(
///     parse_command("/model gemma-7b-it"),
///     Some(ChatCommand::Model(ModelId::Gemma7bIt))
/// );
/// assert!(parse_command("What is a llama?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "model" => match argument {
            Some(id) => match id.parse::<ModelId>() {
                Ok(model) => ChatCommand::Model(model),
                Err(_) => ChatCommand::Invalid(format!(
                    "Unknown model: {id} (use /models to list the choices)"
                )),
            },
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" => ChatCommand::Models,
        "history" => ChatCommand::History,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// One line read from the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput<'a> {
    /// Nothing but whitespace; ignored.
    Blank,

    /// A slash command.
    Command(ChatCommand),

    /// A message for the model, exactly as typed.
    Message(&'a str),
}

/// Classifies a line from the prompt.
///
/// Whitespace is ignored when deciding what the line is, but a message keeps
/// it.
pub fn classify_input(line: &str) -> ChatInput<'_> {
    if line.trim().is_empty() {
        ChatInput::Blank
    } else if let Some(command) = parse_command(line) {
        ChatInput::Command(command)
    } else {
        ChatInput::Message(line)
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /model <name>          Change the model (e.g., /model mixtral-8x7b-32768)
  /models                List the available models
  /history               Show the conversation so far
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
