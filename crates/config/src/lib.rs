//! Configuration loading, validation, and management for reactor.
//!
//! Loads configuration from `~/.reactor/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.reactor/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden by the environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// ReAct loop settings
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("agent", &self.agent)
            .finish()
    }
}

/// Which OpenAI-compatible endpoint to stream from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name used in logs ("openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL of the `/chat/completions` endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per model response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// HTTP timeout for one streaming request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for the ReAct loop itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// What the user's input looks like (rendered into the system prompt)
    #[serde(default = "default_input")]
    pub input: String,

    /// What the final answer should look like (rendered into the system prompt)
    #[serde(default = "default_output")]
    pub output: String,

    /// Turn cap per query; 0 disables the cap
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Literal that ends a tool call's argument section
    #[serde(default = "default_close_marker")]
    pub close_marker: String,

    /// Stream-termination token stripped when it trails the buffer.
    /// An empty string disables stripping.
    #[serde(default = "default_stop_sentinel")]
    pub stop_sentinel: Option<String>,

    /// Tool name that signals the final answer
    #[serde(default = "default_finish_tool")]
    pub finish_tool: String,

    /// Custom system prompt template (built-in template when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<PathBuf>,

    /// JSONL file receiving every transcript append (disabled when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_log: Option<PathBuf>,

    /// Tell the model when it named a tool that does not exist
    #[serde(default)]
    pub report_missing_tool: bool,
}

fn default_input() -> String {
    "A question or task from the user, in plain text.".into()
}
fn default_output() -> String {
    "A concise, direct answer to the user's question.".into()
}
fn default_max_iterations() -> u32 {
    10
}
fn default_close_marker() -> String {
    "</args>".into()
}
fn default_stop_sentinel() -> Option<String> {
    Some("<|endoftext|>".into())
}
fn default_finish_tool() -> String {
    "finish".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            max_iterations: default_max_iterations(),
            close_marker: default_close_marker(),
            stop_sentinel: default_stop_sentinel(),
            finish_tool: default_finish_tool(),
            prompt_template: None,
            transcript_log: None,
            report_missing_tool: false,
        }
    }
}

impl AgentConfig {
    /// The configured sentinel, treating an empty string as disabled.
    pub fn sentinel(&self) -> Option<&str> {
        self.stop_sentinel.as_deref().filter(|s| !s.is_empty())
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.reactor/config.toml).
    ///
    /// Also checks environment variables:
    /// - `REACTOR_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `REACTOR_MODEL`
    /// - `REACTOR_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("REACTOR_API_KEY").or_else(|| {
            if self.api_key.is_none() {
                lookup("OPENAI_API_KEY")
            } else {
                None
            }
        }) {
            self.api_key = Some(key);
        }

        if let Some(model) = lookup("REACTOR_MODEL") {
            self.provider.model = model;
        }

        if let Some(url) = lookup("REACTOR_API_URL") {
            self.provider.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reactor")
    }

    /// Default location of the JSONL transcript log.
    pub fn default_transcript_log() -> PathBuf {
        Self::config_dir().join("transcript.jsonl")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.close_marker.is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.close_marker must not be empty".into(),
            ));
        }

        if self.agent.finish_tool.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.finish_tool must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
