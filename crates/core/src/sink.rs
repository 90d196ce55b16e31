//! Transcript sink trait — write-only persistence for transcript appends.
//!
//! The loop never reads a sink back. Implementations receive one call per
//! appended message, in append order.

use crate::error::SinkError;
use crate::message::Message;
use std::sync::Mutex;

/// An append-only external log of role-tagged messages.
pub trait TranscriptSink: Send + Sync {
    /// A short name for diagnostics (e.g., "jsonl", "memory").
    fn name(&self) -> &str;

    /// Record one appended message.
    fn record(&self, message: &Message) -> Result<(), SinkError>;
}

/// Keeps every recorded message in memory. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<Message>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl TranscriptSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn record(&self, message: &Message) -> Result<(), SinkError> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.clone());
        }
        Ok(())
    }
}
