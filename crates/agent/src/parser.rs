//! Stream parser — turns a model's fragment stream into one decision.
//!
//! The model answers in tagged text:
//!
//! ```text
//! I need the sum first.
//! <tool>add</tool><args>{"a": 2, "b": 3}</args>
//! ```
//!
//! Fragments are accumulated into a [`StreamBuffer`]. As soon as the
//! argument-close marker shows up the stream is closed, so the provider
//! stops generating text nobody will read. The buffer is then normalized
//! and the first `<tool>` and `<args>` sections are extracted.

use crate::events::{ReactEvent, deliver};
use crate::literal::parse_mapping;
use reactor_config::AgentConfig;
use reactor_core::error::{Error, Result};
use reactor_core::provider::ResponseStream;
use reactor_core::tool::{Arguments, render_value};
use regex::Regex;
use std::sync::LazyLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

static TOOL_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tool>(.*?)</tool>").expect("tool section pattern"));
static ARGS_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<args>(.*?)</args>").expect("args section pattern"));

/// Argument key carrying the answer of a finish call.
pub const FINAL_ANSWER_KEY: &str = "final_answer";

/// What the model decided to do this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDecision {
    /// Call a tool with keyword arguments.
    Tool { name: String, arguments: Arguments },
    /// Stop and return the answer.
    Finish { final_answer: String },
    /// No usable decision could be extracted.
    Malformed { raw_text: String },
}

/// A decision plus everything needed to record the turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub decision: ParsedDecision,
    /// The normalized buffer, re-appended verbatim as the assistant message.
    pub raw: String,
    /// Non-empty fragments read from the stream.
    pub fragments: usize,
    /// Whether reading stopped at the close marker rather than stream end.
    pub early_stop: bool,
}

/// Accumulates fragments for a single parse.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    text: String,
    marker: String,
    fragments: usize,
    stopped: bool,
}

impl StreamBuffer {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            marker: marker.into(),
            fragments: 0,
            stopped: false,
        }
    }

    /// Append a fragment. Returns `true` once the close marker is present,
    /// at which point the caller should stop reading.
    pub fn push(&mut self, fragment: &str) -> bool {
        if self.stopped {
            return true;
        }

        // Only the tail can contain a marker that was not there before.
        let mut scan_from = self
            .text
            .len()
            .saturating_sub(self.marker.len().saturating_sub(1));
        self.text.push_str(fragment);
        self.fragments += 1;

        while !self.text.is_char_boundary(scan_from) {
            scan_from -= 1;
        }
        if !self.marker.is_empty() && self.text[scan_from..].contains(&self.marker) {
            self.stopped = true;
        }
        self.stopped
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Hand back the accumulated text.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Parses tagged model output into a [`ParsedDecision`].
#[derive(Debug, Clone)]
pub struct StreamParser {
    close_marker: String,
    sentinel: Option<String>,
    finish_tool: String,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self {
            close_marker: "</args>".into(),
            sentinel: Some("<|endoftext|>".into()),
            finish_tool: "finish".into(),
        }
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parser from the `[agent]` config section.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            close_marker: config.close_marker.clone(),
            sentinel: config.sentinel().map(str::to_string),
            finish_tool: config.finish_tool.clone(),
        }
    }

    pub fn with_close_marker(mut self, marker: impl Into<String>) -> Self {
        self.close_marker = marker.into();
        self
    }

    /// Set the trailing stop sentinel; `None` or an empty string disables it.
    pub fn with_sentinel(mut self, sentinel: Option<String>) -> Self {
        self.sentinel = sentinel.filter(|s| !s.is_empty());
        self
    }

    pub fn with_finish_tool(mut self, name: impl Into<String>) -> Self {
        self.finish_tool = name.into();
        self
    }

    pub fn close_marker(&self) -> &str {
        &self.close_marker
    }

    pub fn finish_tool(&self) -> &str {
        &self.finish_tool
    }

    /// A fresh buffer watching for this parser's close marker.
    pub fn buffer(&self) -> StreamBuffer {
        StreamBuffer::new(self.close_marker.clone())
    }

    /// Cut everything after the first close marker, then drop a trailing
    /// stop sentinel.
    pub fn normalize(&self, text: &str) -> String {
        let mut text = text.to_string();

        if !self.close_marker.is_empty()
            && let Some(at) = text.find(&self.close_marker)
        {
            text.truncate(at + self.close_marker.len());
        }

        if let Some(sentinel) = &self.sentinel {
            let end = text.trim_end().len();
            if text[..end].ends_with(sentinel.as_str()) {
                text.truncate(end - sentinel.len());
            }
        }

        text
    }

    /// Extract a decision from normalized text.
    pub fn decide(&self, text: &str) -> ParsedDecision {
        let malformed = || ParsedDecision::Malformed {
            raw_text: text.to_string(),
        };

        let (Some(tool), Some(args)) = (TOOL_SECTION.captures(text), ARGS_SECTION.captures(text))
        else {
            debug!("No complete <tool>/<args> sections in model output");
            return malformed();
        };

        let name = tool[1].trim();
        if name.is_empty() {
            debug!("Empty tool name in model output");
            return malformed();
        }

        let arguments = match parse_mapping(&args[1]) {
            Ok(arguments) => arguments,
            Err(e) => {
                debug!(tool = %name, error = %e, "Tool arguments are not a literal mapping");
                return malformed();
            }
        };

        if name == self.finish_tool {
            return match arguments.get(FINAL_ANSWER_KEY) {
                Some(answer) => ParsedDecision::Finish {
                    final_answer: render_value(answer),
                },
                None => {
                    debug!("Finish call without {FINAL_ANSWER_KEY}");
                    malformed()
                }
            };
        }

        ParsedDecision::Tool {
            name: name.to_string(),
            arguments,
        }
    }

    /// Normalize a filled buffer and decide.
    pub fn parse(&self, buffer: StreamBuffer) -> ParseOutcome {
        let fragments = buffer.fragments();
        let early_stop = buffer.is_stopped();
        let raw = self.normalize(&buffer.finish());
        let decision = self.decide(&raw);

        ParseOutcome {
            decision,
            raw,
            fragments,
            early_stop,
        }
    }

    /// Read `stream` until the close marker, the end of the stream, or
    /// cancellation, then parse what arrived.
    ///
    /// The stream is closed before this returns on every path. Fragments
    /// are forwarded to `events` as they arrive.
    pub async fn consume(
        &self,
        stream: &mut ResponseStream,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<ReactEvent>>,
    ) -> Result<ParseOutcome> {
        let mut buffer = self.buffer();

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    stream.close();
                    return Err(Error::Cancelled);
                }
                item = stream.next() => item,
            };

            let chunk = match item {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    stream.close();
                    return Err(e.into());
                }
                None => break,
            };

            if let Some(text) = chunk.content.as_deref()
                && !text.is_empty()
            {
                trace!(fragment = %text, "Model fragment");
                if let Some(tx) = events {
                    let event = ReactEvent::Fragment {
                        content: text.to_string(),
                    };
                    if !deliver(tx, event, cancel).await {
                        stream.close();
                        return Err(Error::Cancelled);
                    }
                }
                if buffer.push(text) {
                    debug!(fragments = buffer.fragments(), "Close marker seen, stopping stream");
                    break;
                }
            }

            if chunk.done {
                break;
            }
        }

        stream.close();
        Ok(self.parse(buffer))
    }
}
