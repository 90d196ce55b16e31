//! `reactor doctor` — diagnose configuration and provider reachability.

use super::{config_file, load_config};
use reactor_agent::PromptTemplate;
use reactor_core::provider::Provider;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("reactor doctor");
    println!("==============\n");

    let mut issues = 0;

    let file = config_file(config_path);
    if file.exists() {
        println!("  ✅ Config file found: {}", file.display());
    } else {
        println!("  ⚠️  No config file at {}, using defaults", file.display());
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e:#}");
            summary(issues + 1);
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key: set REACTOR_API_KEY unless the endpoint is local");
    }

    match &config.agent.prompt_template {
        Some(path) => match PromptTemplate::load(path) {
            Ok(_) => println!("  ✅ Prompt template readable: {}", path.display()),
            Err(e) => {
                println!("  ❌ {e}");
                issues += 1;
            }
        },
        None => println!("  ✅ Using built-in prompt"),
    }

    match reactor_providers::from_config(&config) {
        Ok(provider) => match reachability(provider.as_ref()).await {
            Ok(()) => println!(
                "  ✅ Provider {} reachable at {}",
                provider.name(),
                config.provider.api_url
            ),
            Err(reason) => {
                println!("  ❌ Provider {} unreachable: {reason}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Provider not configured: {e}");
            issues += 1;
        }
    }

    summary(issues);
    Ok(())
}

/// Ask the provider whether it is reachable.
async fn reachability(provider: &dyn Provider) -> Result<(), String> {
    match provider.health_check().await {
        Ok(true) => Ok(()),
        Ok(false) => Err("endpoint answered with an error status".into()),
        Err(e) => Err(e.to_string()),
    }
}

fn summary(issues: usize) {
    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
}
