//! Built-in tool implementations for reactor.
//!
//! Each module exposes a [`Tool`](reactor_core::Tool) implementation that
//! the agent can call through the `<tool>`/`<args>` protocol.

pub mod add;
pub mod calculator;
pub mod clock;

use reactor_core::tool::{ToolDescriptor, ToolRegistry};

/// Create a registry holding every built-in tool, in prompt order.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(ToolDescriptor::new(add::AddTool));
    registry.register(ToolDescriptor::new(calculator::CalculatorTool));
    registry.register(ToolDescriptor::new(clock::CurrentTimeTool));
    registry
}
