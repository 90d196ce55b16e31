//! `reactor chat` — one query per stdin line.

use super::{apply_log_flag, build_agent, ctrl_c_token, load_config};
use reactor_agent::ReactAgent;
use reactor_core::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

pub async fn run(config_path: Option<&Path>, log: Option<Option<PathBuf>>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    apply_log_flag(&mut config, log);
    let cancel = ctrl_c_token();
    let mut agent = build_agent(&config, None, cancel.clone())?;

    println!();
    println!("  reactor: interactive mode");
    println!();
    println!("  Provider:  {}", config.provider.name);
    println!("  Model:     {}", config.provider.model);
    println!("  Tools:     {}", agent.tools().names().join(", "));
    println!();
    println!("  Each line is a new query. Type 'exit' or Ctrl+C to quit.");
    println!();

    session(&mut agent, BufReader::new(tokio::io::stdin()), &cancel).await
}

/// Answer queries from `input` until `exit`, end of input or cancellation.
async fn session<R>(
    agent: &mut ReactAgent,
    input: R,
    cancel: &CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                println!();
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" || query == "quit" {
            break;
        }

        match agent.run(query).await {
            Ok(outcome) => {
                println!();
                for line in outcome.answer.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(Error::Cancelled) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    Ok(())
}
