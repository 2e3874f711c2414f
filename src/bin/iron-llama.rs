//! Interactive chat with Llama 3 and friends over the Groq API.
//!
//! # Usage
//!
//! ```bash
//! # Settings from .env, secrets.toml or the environment
//! iron-llama
//!
//! # Start with a different model
//! iron-llama --model mixtral-8x7b-32768
//!
//! # Read settings from elsewhere
//! iron-llama --env-file ~/.config/iron-llama.env --secrets-file .streamlit/secrets.toml
//!
//! # Disable colors (useful for piping output)
//! iron-llama --no-color
//! ```
//!
//! Set `RUST_LOG=iron_llama=debug` to see request and stream logging on stderr.
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/model <name>` - Change the model
//! - `/models` - List the models
//! - `/history` - Show the conversation so far
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::process::ExitCode;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::error;
use tracing_subscriber::EnvFilter;

use iron_llama::chat::{
    CAPTION, ChatArgs, ChatCommand, ChatConfig, ChatInput, ChatSession, PlainTextRenderer,
    Renderer, TITLE, classify_input, help_text,
};
use iron_llama::{Groq, ModelId, SELECTOR_TITLE};

const PROMPT: &str = "Ask me: ";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("iron-llama [OPTIONS]");
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "iron-llama failed");
            eprintln!("iron-llama: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = ChatConfig::try_from(args)?;
    let (mut session, client) = ChatSession::start(&options.loader(), options.model, |config| {
        Groq::with_options(config.api_key.clone(), options.base_url.clone(), None)
    })?;
    let mut renderer = PlainTextRenderer::with_color(options.use_color);
    let mut rl = DefaultEditor::new()?;

    renderer.print_title(TITLE, CAPTION);
    renderer.print_info(&format!("{SELECTOR_TITLE} (model: {})", session.model()));
    renderer.print_info("Type /help for commands, /quit to exit\n");
    session.render_history(&mut renderer);

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let message = match classify_input(&line) {
                    ChatInput::Blank => continue,
                    ChatInput::Message(message) => message,
                    ChatInput::Command(cmd) => {
                        let _ = rl.add_history_entry(line.trim());
                        match cmd {
                            ChatCommand::Quit => {
                                println!("Goodbye!");
                                break;
                            }
                            ChatCommand::Help => {
                                for line in help_text().lines() {
                                    println!("    {line}");
                                }
                            }
                            ChatCommand::Model(model) => {
                                session.set_model(model);
                                renderer.print_info(&format!("Model changed to: {model}"));
                            }
                            ChatCommand::Models => {
                                print_models(session.model_selector().models(), session.model());
                            }
                            ChatCommand::History => {
                                session.render_history(&mut renderer);
                            }
                            ChatCommand::Stats => {
                                print_stats(&session);
                            }
                            ChatCommand::Invalid(message) => {
                                renderer.print_error(&message);
                            }
                        }
                        continue;
                    }
                };

                let _ = rl.add_history_entry(message);
                if let Err(e) = session.submit(&client, message, &mut renderer).await {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt discards the line.
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn print_models(models: &[ModelId], current: ModelId) {
    println!("    {SELECTOR_TITLE}:");
    for model in models {
        let marker = if *model == current { "*" } else { " " };
        println!("    {marker} {model}");
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!(
        "      Turns: {} ({} user / {} assistant)",
        stats.turn_count, stats.user_turns, stats.assistant_turns
    );
    println!(
        "      Replies: {} completed / {} failed",
        stats.completed_turns, stats.failed_turns
    );
}
