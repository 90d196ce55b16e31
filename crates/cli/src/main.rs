//! reactor CLI — the main entry point.
//!
//! Commands:
//! - `ask`     — Run one query through the ReAct loop
//! - `chat`    — Read queries from stdin, one per line
//! - `tools`   — List the built-in tools
//! - `prompt`  — Print the rendered system prompt
//! - `config`  — Show or initialize configuration
//! - `doctor`  — Check config, prompt and provider reachability

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "reactor",
    about = "reactor — a streaming ReAct agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.reactor/config.toml)
    #[arg(short, long, global = true, env = "REACTOR_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query and print the final answer
    Ask {
        /// The question or task
        query: String,

        /// Append the transcript to a JSONL log (default path if no value)
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        log: Option<Option<PathBuf>>,

        /// Echo model output and tool calls to stderr while running
        #[arg(short, long)]
        stream: bool,
    },

    /// Interactive mode: one query per line until `exit`
    Chat {
        /// Append the transcript to a JSONL log (default path if no value)
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        log: Option<Option<PathBuf>>,
    },

    /// List the built-in tools
    Tools,

    /// Print the rendered system prompt
    Prompt,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check configuration and provider reachability
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Ask { query, log, stream } => {
            commands::ask::run(config_path, &query, log, stream).await?
        }
        Commands::Chat { log } => commands::chat::run(config_path, log).await?,
        Commands::Tools => commands::tools::run(config_path)?,
        Commands::Prompt => commands::prompt::run(config_path)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force)?,
        },
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
