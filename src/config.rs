//! Startup configuration.
//!
//! The API key and the three conversation texts are resolved once, before the
//! first render, from an ordered list of [`ConfigSource`]s.  The first source
//! that provides every key wins.  A source that does not exist, or that is
//! missing keys, is skipped; any other failure while reading a source aborts
//! the load.

use std::collections::HashMap;
use std::fmt;
use std::io;

use tracing::{debug, info};
use utf8path::Path;

use crate::error::{Error, Result};

/// Key holding the provider API key.
pub const API_KEY: &str = "GROQ_API_KEY";

/// Key holding the greeting shown as the first assistant turn.
pub const GREETING: &str = "INITIAL_RESPONSE";

/// Key holding the assistant message sent ahead of every transcript.
pub const SEED_ASSISTANT_MESSAGE: &str = "INITIAL_MSG";

/// Key holding the system context sent ahead of every transcript.
pub const SYSTEM_CONTEXT: &str = "CHAT_CONTEXT";

/// Every key a source must provide to resolve.
pub const REQUIRED_KEYS: [&str; 4] = [API_KEY, GREETING, SEED_ASSISTANT_MESSAGE, SYSTEM_CONTEXT];

/// Default dotenv file, for local development.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Default secrets file, for deployments.
pub const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

/// The provider API key.  Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key itself, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Resolved configuration.  Read-only for the rest of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Provider API key.
    pub api_key: ApiKey,

    /// Greeting shown as the first assistant turn of a session.
    pub greeting: String,

    /// Assistant message sent after the system context on every request.
    pub seed_assistant_message: String,

    /// System context sent first on every request.
    pub system_context: String,
}

impl Configuration {
    /// Creates a configuration from its parts.
    pub fn new(
        api_key: ApiKey,
        greeting: impl Into<String>,
        seed_assistant_message: impl Into<String>,
        system_context: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            greeting: greeting.into(),
            seed_assistant_message: seed_assistant_message.into(),
            system_context: system_context.into(),
        }
    }

    fn from_values(values: &mut HashMap<String, String>) -> Option<Self> {
        let api_key = values.remove(API_KEY)?;
        let greeting = values.remove(GREETING)?;
        let seed_assistant_message = values.remove(SEED_ASSISTANT_MESSAGE)?;
        let system_context = values.remove(SYSTEM_CONTEXT)?;
        Some(Self::new(
            ApiKey::new(api_key),
            greeting,
            seed_assistant_message,
            system_context,
        ))
    }
}

/// A place configuration values can come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A dotenv-format `KEY=value` file.
    EnvFile(Path<'static>),

    /// A TOML file with the keys as top-level string values.
    SecretsFile(Path<'static>),

    /// The environment of this process.
    ProcessEnv,
}

impl ConfigSource {
    /// A dotenv file source.
    pub fn env_file(path: impl AsRef<str>) -> Self {
        ConfigSource::EnvFile(Path::from(path.as_ref()).into_owned())
    }

    /// A secrets file source.
    pub fn secrets_file(path: impl AsRef<str>) -> Self {
        ConfigSource::SecretsFile(Path::from(path.as_ref()).into_owned())
    }

    /// Read the required keys this source has.
    ///
    /// Returns `Ok(None)` when the source is unavailable.
    fn read(&self) -> Result<Option<HashMap<String, String>>> {
        match self {
            ConfigSource::EnvFile(path) => read_env_file(path),
            ConfigSource::SecretsFile(path) => read_secrets_file(path),
            ConfigSource::ProcessEnv => Ok(Some(
                REQUIRED_KEYS
                    .iter()
                    .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
                    .collect(),
            )),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::EnvFile(path) => write!(f, "env file {}", path.as_str()),
            ConfigSource::SecretsFile(path) => write!(f, "secrets file {}", path.as_str()),
            ConfigSource::ProcessEnv => f.write_str("process environment"),
        }
    }
}

fn read_env_file(path: &Path) -> Result<Option<HashMap<String, String>>> {
    let text = match std::fs::read_to_string(path.as_str()) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(Error::io(
                format!("could not read {}", path.as_str()),
                err,
            ));
        }
    };
    let normalized = quote_bare_values(&text);
    let mut values = HashMap::new();
    for item in dotenvy::from_read_iter(normalized.as_bytes()) {
        let (key, value) = item.map_err(|err| {
            Error::configuration(
                format!("could not parse {}: {err}", path.as_str()),
                vec![],
            )
        })?;
        if REQUIRED_KEYS.contains(&key.as_str()) {
            values.insert(key, value);
        }
    }
    Ok(Some(values))
}

/// Rewrite `KEY=some free text` lines into single-quoted values dotenvy accepts.
///
/// Unquoted values run to the end of the line or to a ` #` comment, keep
/// inner whitespace, and are taken literally.  Quoted values, including ones
/// spanning several lines, are left alone.
fn quote_bare_values(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open_quote: Option<char> = None;
    for line in text.lines() {
        if let Some(quote) = open_quote {
            if closes(line, quote) {
                open_quote = None;
            }
            out.push_str(line);
            out.push('\n');
            continue;
        }
        let trimmed = line.trim_start();
        let assignment = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let split = assignment.split_once('=').filter(|_| !trimmed.starts_with('#'));
        let Some((key, value)) = split else {
            out.push_str(line);
            out.push('\n');
            continue;
        };
        let value = value.trim_start();
        match value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                if !closes(&value[1..], quote) {
                    open_quote = Some(quote);
                }
                out.push_str(line);
            }
            _ => {
                let value = strip_inline_comment(value).trim_end();
                out.push_str(key.trim());
                out.push('=');
                if !value.is_empty() {
                    out.push('\'');
                    out.push_str(&value.replace('\'', r"'\''"));
                    out.push('\'');
                }
            }
        }
        out.push('\n');
    }
    out
}

/// Whether `rest` contains the quote that ends a value opened with `quote`.
fn closes(rest: &str, quote: char) -> bool {
    let mut escaped = false;
    for c in rest.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' && quote == '"' {
            escaped = true;
        } else if c == quote {
            return true;
        }
    }
    false
}

fn strip_inline_comment(value: &str) -> &str {
    let mut prev_space = false;
    for (i, c) in value.char_indices() {
        if c == '#' && prev_space {
            return &value[..i];
        }
        prev_space = c.is_whitespace();
    }
    value
}

fn read_secrets_file(path: &Path) -> Result<Option<HashMap<String, String>>> {
    let text = match std::fs::read_to_string(path.as_str()) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(Error::io(
                format!("could not read {}", path.as_str()),
                err,
            ));
        }
    };
    let table: toml::Table = toml::from_str(&text).map_err(|err| {
        Error::configuration(
            format!("could not parse {}: {err}", path.as_str()),
            vec![],
        )
    })?;
    let mut values = HashMap::new();
    for key in REQUIRED_KEYS {
        match table.get(key) {
            Some(toml::Value::String(value)) => {
                values.insert(key.to_string(), value.clone());
            }
            Some(_) => {
                return Err(Error::configuration(
                    format!("{key} in {} must be a string", path.as_str()),
                    vec![],
                ));
            }
            None => {}
        }
    }
    Ok(Some(values))
}

/// Resolves a [`Configuration`] from an ordered list of sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// A loader with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `.env` file, then `secrets.toml`, then the process environment.
    pub fn with_default_sources() -> Self {
        Self::new()
            .with_source(ConfigSource::env_file(DEFAULT_ENV_FILE))
            .with_source(ConfigSource::secrets_file(DEFAULT_SECRETS_FILE))
            .with_source(ConfigSource::ProcessEnv)
    }

    /// Add a source after the existing ones.
    pub fn with_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// The sources in the order they are tried.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Try each source in turn and return the first complete configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if no source provides every key, or the
    /// error of the first source that exists but cannot be read.
    pub fn load(&self) -> Result<Configuration> {
        let mut seen: Vec<&str> = Vec::new();
        for source in &self.sources {
            let Some(mut values) = source.read()? else {
                debug!(%source, "configuration source unavailable");
                continue;
            };
            if values.get(API_KEY).is_some_and(|key| key.trim().is_empty()) {
                values.remove(API_KEY);
            }
            for key in REQUIRED_KEYS {
                if values.contains_key(key) && !seen.contains(&key) {
                    seen.push(key);
                }
            }
            if let Some(config) = Configuration::from_values(&mut values) {
                info!(%source, "configuration resolved");
                return Ok(config);
            }
            debug!(%source, "configuration source incomplete");
        }
        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| !seen.contains(*key))
            .map(|key| key.to_string())
            .collect();
        let message = if missing.iter().any(|key| key == API_KEY) {
            format!("{API_KEY} not found in any configuration source")
        } else if missing.is_empty() {
            "no single configuration source provides every key".to_string()
        } else {
            "configuration incomplete in every source".to_string()
        };
        Err(Error::configuration(message, missing))
    }
}
