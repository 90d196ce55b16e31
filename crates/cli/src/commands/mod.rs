//! Subcommand implementations and the wiring they share.

pub mod ask;
pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod prompt;
pub mod tools;

use anyhow::Context;
use reactor_agent::{ReactAgent, ReactEvent};
use reactor_config::AppConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Resolve the config file path.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load config from `path` (or the default location) with env overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let file = config_file(path);
    AppConfig::load_with_env(&file)
        .with_context(|| format!("Failed to load config from {}", file.display()))
}

/// Apply a `--log [PATH]` flag on top of the configured transcript log.
pub fn apply_log_flag(config: &mut AppConfig, log: Option<Option<PathBuf>>) {
    if let Some(path) = log {
        config.agent.transcript_log =
            Some(path.unwrap_or_else(AppConfig::default_transcript_log));
    }
}

/// Build a ready-to-run agent over the configured provider and built-in tools.
pub fn build_agent(
    config: &AppConfig,
    events: Option<mpsc::Sender<ReactEvent>>,
    cancel: CancellationToken,
) -> anyhow::Result<ReactAgent> {
    let provider = reactor_providers::from_config(config).with_context(|| {
        if config.has_api_key() {
            "Failed to build provider".to_string()
        } else {
            "Failed to build provider. Set REACTOR_API_KEY or OPENAI_API_KEY, \
             or point provider.api_url at a local endpoint"
                .to_string()
        }
    })?;
    let tools = Arc::new(reactor_tools::default_registry());

    let mut agent = ReactAgent::from_config(provider, tools, config)
        .context("Failed to build agent")?
        .with_cancellation(cancel);

    if let Some(tx) = events {
        agent = agent.with_events(tx);
    }
    Ok(agent)
}

/// A token cancelled on Ctrl+C.
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}
