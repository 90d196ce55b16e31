//! # reactor core
//!
//! Domain types, traits, and error definitions for the reactor ReAct agent
//! loop. This crate has **no runtime or network dependencies** beyond tokio's
//! channel primitives — it defines the domain model that every other crate
//! implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the loop is defined as a trait here:
//! - [`Provider`] produces a cancellable stream of response fragments
//! - [`Tool`] is a callable the model may invoke by name
//! - [`TranscriptSink`] receives every transcript append
//!
//! Implementations live in their respective crates, which keeps testing
//! with scripted stand-ins trivial.

pub mod error;
pub mod message;
pub mod provider;
pub mod sink;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SinkError, TemplateError, ToolError};
pub use message::{Message, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ResponseStream, StreamChunk, StreamItem, Usage};
pub use sink::{MemorySink, TranscriptSink};
pub use tool::{Arguments, ParamKind, ParamSpec, Tool, ToolDescriptor, ToolRegistry};
