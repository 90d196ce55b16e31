//! Error types for the reactor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Only provider, template, cancellation and iteration-limit failures are
//! fatal to a query. Tool failures are rendered into observations and fed
//! back to the model; malformed decisions never become errors at all.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all reactor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Prompt template errors ---
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    // --- Loop control ---
    #[error("Iteration limit of {limit} turns reached without a final answer")]
    IterationLimit { limit: u32 },

    #[error("Query cancelled")]
    Cancelled,
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the model collaborator. Fatal to the current query.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures raised while invoking a tool. Recovered by the agent loop.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Invalid arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

impl ToolError {
    /// Shorthand used by tool implementations to report a failed call.
    pub fn failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for argument validation failures.
    pub fn invalid(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }
}

/// System prompt template could not be loaded.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Prompt template not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read prompt template at {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
}

/// Transcript sink write failure. Logged, never propagated into the loop.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Transcript sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcript sink serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
