//! Agent-level progress events.
//!
//! `ReactEvent` lets a caller watch a query unfold: raw fragments as the
//! model writes them, each tool call and its observation, and the final
//! answer. Events are delivered through an optional bounded channel; a
//! closed receiver never affects the loop, and a stalled one only holds it
//! until the query is cancelled.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Events emitted by the agent while a query runs.
///
/// - `fragment`       : partial text from the model
/// - `tool_call`      : a registered tool is about to run
/// - `observation`    : the tool finished (or failed)
/// - `no_observation` : the turn produced nothing to dispatch
/// - `finished`       : the final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// Partial text from the model.
    Fragment { content: String },

    /// The agent is calling a tool.
    ToolCall {
        iteration: u32,
        name: String,
        arguments: Value,
    },

    /// Tool execution completed.
    Observation {
        iteration: u32,
        name: String,
        content: String,
        success: bool,
    },

    /// Nothing was dispatched this turn: malformed output or unknown tool.
    NoObservation { iteration: u32, reason: String },

    /// The query finished.
    Finished {
        answer: String,
        iterations: u32,
        tool_calls: usize,
    },
}

impl ReactEvent {
    /// Short event name, matching the serde tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Fragment { .. } => "fragment",
            Self::ToolCall { .. } => "tool_call",
            Self::Observation { .. } => "observation",
            Self::NoObservation { .. } => "no_observation",
            Self::Finished { .. } => "finished",
        }
    }
}

/// Send `event` unless `cancel` fires first.
///
/// Returns `false` only when cancelled. A closed receiver counts as delivered.
pub(crate) async fn deliver(
    tx: &mpsc::Sender<ReactEvent>,
    event: ReactEvent,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tx.send(event) => true,
    }
}
