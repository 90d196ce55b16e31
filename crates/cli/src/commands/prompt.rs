//! `reactor prompt` — print the rendered system prompt.

use super::load_config;
use reactor_agent::PromptTemplate;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let agent = &config.agent;

    let template = match &agent.prompt_template {
        Some(path) => PromptTemplate::load(path)?,
        None => PromptTemplate::builtin(),
    }
    .with_finish_tool(&agent.finish_tool);

    let registry = reactor_tools::default_registry();
    println!("{}", template.render(&agent.input, &agent.output, &registry));
    Ok(())
}
