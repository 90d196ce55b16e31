//! Shared test helpers for agent tests.

use reactor_core::error::ProviderError;
use reactor_core::provider::{
    Provider, ProviderRequest, ResponseStream, StreamChunk, StreamItem,
};
use reactor_core::tool::{ParamKind, ParamSpec, ToolDescriptor, ToolRegistry};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum Turn {
    /// Stream these items, in order.
    Stream(Vec<StreamItem>),
    /// Fail the `stream()` call itself.
    Fail(ProviderError),
    /// Open a stream that never produces anything.
    Hang,
}

impl Turn {
    /// Text fragments followed by a terminal chunk.
    pub fn text(fragments: &[&str]) -> Self {
        let mut items: Vec<StreamItem> = fragments
            .iter()
            .map(|f| Ok(StreamChunk::text(*f)))
            .collect();
        items.push(Ok(StreamChunk::done(None)));
        Self::Stream(items)
    }
}

/// A provider that replays scripted turns and records every request.
///
/// Once the script runs out, the `fallback` turn (if any) repeats forever;
/// otherwise the call fails.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<Turn>>,
    fallback: Option<Turn>,
    requests: Mutex<Vec<ProviderRequest>>,
    // Keeps hanging streams open.
    held: Mutex<Vec<mpsc::Sender<StreamItem>>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        }
    }

    /// One single-fragment turn per string.
    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Turn::text(&[r])).collect())
    }

    /// Repeat `turn` whenever the script is exhausted.
    pub fn repeating(turn: Turn) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Some(turn);
        provider
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ResponseStream, ProviderError> {
        self.requests.lock().unwrap().push(request);

        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone());

        match turn {
            Some(Turn::Stream(items)) => Ok(ResponseStream::from_items(items)),
            Some(Turn::Fail(e)) => Err(e),
            Some(Turn::Hang) => {
                let (tx, stream) = ResponseStream::channel(1);
                self.held.lock().unwrap().push(tx);
                Ok(stream)
            }
            None => Err(ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            }),
        }
    }
}

/// A registry holding `add(a: int, b: int)` and a tool that always fails.
pub fn math_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with(ToolDescriptor::from_fn(
            "add",
            "Add two integers.",
            vec![
                ParamSpec::required("a", ParamKind::Integer),
                ParamSpec::required("b", ParamKind::Integer),
            ],
            |args| {
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                Ok(json!(a + b))
            },
        ))
        .with(ToolDescriptor::from_fn(
            "explode",
            "Always fails.",
            vec![],
            |_| Err("boom".into()),
        ))
}
