//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! options the binary runs with.

use arrrg_derive::CommandLine;

use crate::config::{ConfigLoader, ConfigSource, DEFAULT_ENV_FILE, DEFAULT_SECRETS_FILE};
use crate::error::{Error, Result};
use crate::types::ModelId;

/// Command-line arguments for the iron-llama tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to start the session with.
    #[arrrg(optional, "Model to use (default: llama3-70b-8192)", "MODEL")]
    pub model: Option<String>,

    /// Dotenv file consulted first for settings.
    #[arrrg(optional, "Dotenv file to read settings from (default: .env)", "PATH")]
    pub env_file: Option<String>,

    /// TOML secrets file consulted second for settings.
    #[arrrg(optional, "TOML secrets file (default: secrets.toml)", "PATH")]
    pub secrets_file: Option<String>,

    /// Override for the provider's base URL.
    #[arrrg(optional, "Base URL of the completion API", "URL")]
    pub base_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Resolved options for a chat run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The model selected at startup.
    pub model: ModelId,

    /// Dotenv file tried first.
    pub env_file: String,

    /// Secrets file tried second.
    pub secrets_file: String,

    /// Base URL override for the provider.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            model: ModelId::default(),
            env_file: DEFAULT_ENV_FILE.to_string(),
            secrets_file: DEFAULT_SECRETS_FILE.to_string(),
            base_url: None,
            use_color: true,
        }
    }

    /// Sets the starting model.
    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = model;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The configuration loader for these options.
    ///
    /// The dotenv file comes first, then the secrets file, then the process
    /// environment.
    pub fn loader(&self) -> ConfigLoader {
        ConfigLoader::new()
            .with_source(ConfigSource::env_file(&self.env_file))
            .with_source(ConfigSource::secrets_file(&self.secrets_file))
            .with_source(ConfigSource::ProcessEnv)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let defaults = ChatConfig::new();
        let model = match args.model {
            Some(model) => model.parse()?,
            None => defaults.model,
        };
        Ok(ChatConfig {
            model,
            env_file: args.env_file.unwrap_or(defaults.env_file),
            secrets_file: args.secrets_file.unwrap_or(defaults.secrets_file),
            base_url: args.base_url,
            use_color: !args.no_color,
        })
    }
}
