//! System prompt templates.
//!
//! A template is plain text with `{{ name }}` placeholders:
//!
//! | placeholder        | replaced by                                  |
//! |--------------------|----------------------------------------------|
//! | `{{ input }}`      | what the agent will receive                  |
//! | `{{ output }}`     | what the agent must produce                  |
//! | `{{ tools }}`      | one `- signature: summary` line per tool     |
//! | `{{ tool_names }}` | comma-separated tool names                   |
//! | `{{ finish_tool }}`| name of the tool that ends a query           |
//!
//! Unknown placeholders are left as written.

use reactor_core::error::TemplateError;
use reactor_core::tool::ToolRegistry;
use std::path::Path;
use tracing::debug;

/// The prompt shipped with the crate.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/system_prompt.md");

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
    finish_tool: String,
}

impl PromptTemplate {
    /// Use `source` as the template text.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            finish_tool: "finish".into(),
        }
    }

    /// The built-in ReAct prompt.
    pub fn builtin() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }

    /// Read a template from disk.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                TemplateError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;

        debug!(path = %path.display(), bytes = source.len(), "Loaded prompt template");
        Ok(Self::new(source.trim()))
    }

    pub fn with_finish_tool(mut self, name: impl Into<String>) -> Self {
        self.finish_tool = name.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the system prompt.
    pub fn render(&self, input: &str, output: &str, tools: &ToolRegistry) -> String {
        let tool_lines = tools
            .iter()
            .map(|t| format!("- {}: {}", t.signature(), t.summary()))
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = tools.names().join(", ");

        let mut rendered = String::with_capacity(self.source.len() + tool_lines.len());
        let mut rest = self.source.as_str();

        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else {
                break;
            };
            let key = rest[open + 2..open + 2 + close].trim();
            let value = match key {
                "input" => Some(input),
                "output" => Some(output),
                "tools" => Some(tool_lines.as_str()),
                "tool_names" => Some(tool_names.as_str()),
                "finish_tool" => Some(self.finish_tool.as_str()),
                _ => None,
            };

            rendered.push_str(&rest[..open]);
            match value {
                Some(value) => rendered.push_str(value),
                None => rendered.push_str(&rest[open..open + close + 4]),
            }
            rest = &rest[open + close + 4..];
        }

        rendered.push_str(rest);
        rendered
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}
