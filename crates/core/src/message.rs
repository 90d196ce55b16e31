//! Message and Transcript domain types.
//!
//! These are the value objects that flow through every turn of the loop:
//! the agent appends to the transcript, the provider reads it back in order.

use crate::sink::TranscriptSink;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (rendered prompt template)
    System,
    /// The end user, and tool observations fed back to the model
    User,
    /// The model
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The ordered message history submitted to the model on each turn.
///
/// Every append is mirrored to the optional [`TranscriptSink`]. Sink
/// failures are logged and swallowed; the in-memory history is the source
/// of truth.
#[derive(Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    sink: Option<Arc<dyn TranscriptSink>>,
}

impl Transcript {
    /// Create an empty transcript with no sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty transcript that mirrors appends to `sink`.
    pub fn with_sink(sink: Arc<dyn TranscriptSink>) -> Self {
        Self {
            messages: Vec::new(),
            sink: Some(sink),
        }
    }

    /// Attach or replace the sink.
    pub fn set_sink(&mut self, sink: Arc<dyn TranscriptSink>) {
        self.sink = Some(sink);
    }

    /// Drop all messages. The sink is append-only and is not touched.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Append one message built from a role and content.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.push(Message::new(role, content));
    }

    /// Append an already-built message.
    pub fn push(&mut self, message: Message) {
        if let Some(sink) = &self.sink
            && let Err(e) = sink.record(&message)
        {
            warn!(sink = sink.name(), role = %message.role, "Transcript sink write failed: {e}");
        }
        self.messages.push(message);
    }

    /// Read-only ordered view for submission to the model.
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("messages", &self.messages)
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
