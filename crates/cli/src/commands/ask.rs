//! `reactor ask` — run one query and print the answer.

use super::{apply_log_flag, build_agent, ctrl_c_token, load_config};
use reactor_agent::ReactEvent;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub async fn run(
    config_path: Option<&Path>,
    query: &str,
    log: Option<Option<PathBuf>>,
    stream: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    apply_log_flag(&mut config, log);

    let (tx, printer) = if stream {
        let (tx, rx) = mpsc::channel(64);
        (Some(tx), Some(tokio::spawn(print_events(rx))))
    } else {
        (None, None)
    };

    let mut agent = build_agent(&config, tx, ctrl_c_token())?;
    let result = agent.run(query).await;

    // Closing the event channel lets the printer drain and exit.
    drop(agent);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let outcome = result?;
    tracing::debug!(
        iterations = outcome.iterations,
        tool_calls = outcome.tool_calls,
        "Query finished"
    );
    println!("{}", outcome.answer);
    Ok(())
}

/// Echo progress to stderr, keeping stdout for the answer alone.
pub async fn print_events(mut rx: mpsc::Receiver<ReactEvent>) {
    let mut stderr = std::io::stderr();
    while let Some(event) = rx.recv().await {
        match event {
            ReactEvent::Fragment { content } => {
                let _ = write!(stderr, "{content}");
                let _ = stderr.flush();
            }
            ReactEvent::ToolCall { name, arguments, .. } => {
                let _ = writeln!(stderr, "\n  → {name} {arguments}");
            }
            ReactEvent::Observation { content, success, .. } => {
                let mark = if success { "←" } else { "✗" };
                let _ = writeln!(stderr, "  {mark} {content}");
            }
            ReactEvent::NoObservation { reason, .. } => {
                let _ = writeln!(stderr, "\n  (no observation: {reason})");
            }
            ReactEvent::Finished { .. } => {
                let _ = writeln!(stderr);
            }
        }
    }
}
