//! Tool trait — the abstraction over agent capabilities.
//!
//! A [`Tool`] is the callable. A [`ToolDescriptor`] wraps one, captures its
//! name, description and declared parameters once, and is what the agent
//! renders into the system prompt and dispatches to by name.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keyword arguments passed to a tool, as parsed from the model's output.
pub type Arguments = serde_json::Map<String, Value>;

/// Type hint for a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    List,
    Map,
    Any,
}

impl ParamKind {
    /// The short hint shown to the model in tool signatures.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::String => "str",
            Self::Integer => "int",
            Self::Number => "float",
            Self::Boolean => "bool",
            Self::List => "list",
            Self::Map => "dict",
            Self::Any => "any",
        }
    }

    /// Whether `value` is acceptable for a parameter of this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
            Self::Any => true,
        }
    }
}

/// One entry of a tool's parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.required { "" } else { "?" };
        write!(f, "{}{}: {}", self.name, marker, self.kind.hint())
    }
}

/// The core Tool trait.
///
/// Implementations only do their own work. Argument validation against
/// [`Tool::parameters`] and stringification of the result happen in
/// [`ToolDescriptor::invoke`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add", "calculator").
    fn name(&self) -> &str;

    /// What this tool does. The first line is shown to the model.
    fn description(&self) -> &str;

    /// Declared parameters, in signature order.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Run the tool with already-validated keyword arguments.
    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError>;
}

type ToolFn = dyn Fn(&Arguments) -> Result<Value, String> + Send + Sync;

/// Adapts a plain closure into a [`Tool`].
struct FnTool {
    name: String,
    description: String,
    parameters: Vec<ParamSpec>,
    func: Box<ToolFn>,
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        self.parameters.clone()
    }

    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        (self.func)(arguments).map_err(|reason| ToolError::failed(&self.name, reason))
    }
}

/// An immutable, registered tool: metadata captured once plus the handler.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParamSpec>,
    handler: Arc<dyn Tool>,
}

impl ToolDescriptor {
    /// Wrap a tool implementation.
    pub fn new(tool: impl Tool + 'static) -> Self {
        Self::from_arc(Arc::new(tool))
    }

    /// Wrap a shared tool implementation.
    pub fn from_arc(tool: Arc<dyn Tool>) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
            handler: tool,
        }
    }

    /// Build a descriptor from a synchronous closure.
    ///
    /// An `Err(reason)` from the closure surfaces as
    /// [`ToolError::ExecutionFailed`].
    pub fn from_fn<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParamSpec>,
        func: F,
    ) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::new(FnTool {
            name: name.into(),
            description: description.into(),
            parameters,
            func: Box::new(func),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// First non-empty line of the description.
    pub fn summary(&self) -> &str {
        self.description
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }

    pub fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    /// Render `name(a: int, b: int, note?: str)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Check arguments against the declared parameter list.
    pub fn validate(&self, arguments: &Arguments) -> Result<(), ToolError> {
        for key in arguments.keys() {
            if !self.parameters.iter().any(|p| &p.name == key) {
                return Err(ToolError::invalid(
                    &self.name,
                    format!("unexpected argument '{key}'; expected {}", self.signature()),
                ));
            }
        }

        for param in &self.parameters {
            match arguments.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ToolError::invalid(
                        &self.name,
                        format!("missing required argument '{}'", param.name),
                    ));
                }
                Some(Value::Null) | None => {}
                Some(value) if !param.kind.accepts(value) => {
                    return Err(ToolError::invalid(
                        &self.name,
                        format!(
                            "argument '{}' must be {}, got {}",
                            param.name,
                            param.kind.hint(),
                            value
                        ),
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Validate, call the underlying tool, and render its result as text.
    pub async fn invoke(&self, arguments: &Arguments) -> Result<String, ToolError> {
        self.validate(arguments)?;
        debug!(tool = %self.name, args = arguments.len(), "Invoking tool");
        let value = self.handler.call(arguments).await?;
        Ok(render_value(&value))
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Strings render verbatim, everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A fixed, ordered registry of tools.
///
/// Lookup is a linear scan and the first exact name match wins, so a
/// duplicate registration never shadows the original.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool at the end of the list.
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        if self.get(descriptor.name()).is_some() {
            warn!(tool = %descriptor.name(), "Duplicate tool registration, earlier one wins");
        }
        self.tools.push(descriptor);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, descriptor: ToolDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Get a tool by exact name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ToolDescriptor> {
        self.tools.iter()
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<ToolDescriptor> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = ToolDescriptor>>(iter: I) -> Self {
        let mut registry = Self::new();
        for descriptor in iter {
            registry.register(descriptor);
        }
        registry
    }
}
