//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a transcript to a model and get the reply
//! back as a lazy sequence of text fragments. The consumer may close the
//! sequence early; the producer observes the closed channel and stops.
//!
//! Implementations: OpenAI-compatible endpoints, scripted test providers.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// The transcript, in order
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single fragment of a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A plain text delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            done: false,
            usage: None,
        }
    }

    /// The terminal chunk.
    pub fn done(usage: Option<Usage>) -> Self {
        Self {
            content: None,
            done: true,
            usage,
        }
    }
}

/// Items carried by a [`ResponseStream`].
pub type StreamItem = std::result::Result<StreamChunk, ProviderError>;

/// A cancellable lazy sequence of response fragments.
///
/// Backed by a bounded channel. [`close`](Self::close) tells the producer to
/// stop; dropping the stream has the same effect. Either way the generation
/// resource is released before the next turn starts.
#[derive(Debug)]
pub struct ResponseStream {
    rx: mpsc::Receiver<StreamItem>,
    closed: bool,
}

impl ResponseStream {
    pub fn new(rx: mpsc::Receiver<StreamItem>) -> Self {
        Self { rx, closed: false }
    }

    /// Create a producer handle and the stream it feeds.
    pub fn channel(buffer: usize) -> (mpsc::Sender<StreamItem>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx))
    }

    /// A stream that replays already-known items and then ends.
    pub fn from_items(items: Vec<StreamItem>) -> Self {
        let (tx, stream) = Self::channel(items.len());
        for item in items {
            // Capacity equals the item count, so this cannot fail.
            let _ = tx.try_send(item);
        }
        stream
    }

    /// Wait for the next fragment. `None` once exhausted or closed.
    pub async fn next(&mut self) -> Option<StreamItem> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop consuming and signal the producer to cancel generation.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.rx.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain the whole stream into one string.
    pub async fn collect_text(mut self) -> std::result::Result<String, ProviderError> {
        let mut text = String::new();
        while let Some(item) = self.next().await {
            let chunk = item?;
            if let Some(content) = chunk.content {
                text.push_str(&content);
            }
            if chunk.done {
                break;
            }
        }
        Ok(text)
    }
}

/// The core Provider trait.
///
/// The agent loop calls `stream()` without knowing which backend is being
/// used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response fragments.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ResponseStream, ProviderError>;

    /// Send a request and wait for the complete text.
    ///
    /// Default implementation drains `stream()`.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<String, ProviderError> {
        self.stream(request).await?.collect_text().await
    }

    /// Whether the provider is reachable.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider;

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn stream(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ResponseStream, ProviderError> {
            Ok(ResponseStream::from_items(vec![
                Ok(StreamChunk::text("Hel")),
                Ok(StreamChunk::text("lo")),
                Ok(StreamChunk::done(None)),
                Ok(StreamChunk::text("ignored after done")),
            ]))
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "mock".into(),
            messages: vec![Message::user("hi")],
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    #[test]
    fn provider_request_defaults() {
        let req: ProviderRequest =
            serde_json::from_str(r#"{"model":"gpt-4o","messages":[]}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
    }

    #[tokio::test]
    async fn complete_drains_stream_until_done() {
        let text = FixedProvider.complete(request()).await.unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn close_stops_the_stream_and_the_producer() {
        let (tx, mut stream) = ResponseStream::channel(4);
        tx.send(Ok(StreamChunk::text("a"))).await.unwrap();
        assert_eq!(
            stream.next().await.unwrap().unwrap().content.as_deref(),
            Some("a")
        );

        stream.close();
        assert!(stream.is_closed());
        assert!(stream.next().await.is_none());
        assert!(tx.send(Ok(StreamChunk::text("b"))).await.is_err());
    }

    #[tokio::test]
    async fn collect_text_surfaces_errors() {
        let stream = ResponseStream::from_items(vec![
            Ok(StreamChunk::text("partial")),
            Err(ProviderError::StreamInterrupted("reset".into())),
        ]);
        let err = stream.collect_text().await.unwrap_err();
        assert!(matches!(err, ProviderError::StreamInterrupted(_)));
    }
}
