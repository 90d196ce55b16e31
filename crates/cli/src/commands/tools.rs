//! `reactor tools` — list the built-in tools.

use super::load_config;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = reactor_tools::default_registry();

    for tool in registry.iter() {
        println!("  {:<40} {}", tool.signature(), tool.summary());
        for param in tool.parameters() {
            if let Some(description) = &param.description {
                println!("      {:<36} {description}", param.name);
            }
        }
    }
    println!(
        "  {:<40} {}",
        format!("{}(final_answer: str)", config.agent.finish_tool),
        "Return the final answer and stop."
    );
    Ok(())
}
