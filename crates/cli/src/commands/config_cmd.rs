//! `reactor config` — Configuration management commands.

use super::{config_file, load_config};
use anyhow::{Context, bail};
use std::path::Path;

pub fn show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }

    println!("# {}", config_file(config_path).display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_file(config_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, reactor_config::AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    Ok(())
}
