//! Current date and time.

use async_trait::async_trait;
use chrono::{Local, Utc};
use reactor_core::error::ToolError;
use reactor_core::tool::{Arguments, ParamKind, ParamSpec, Tool};
use serde_json::Value;

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Return the current date and time as an RFC 3339 timestamp.\n\n\
         Pass `utc=True` for UTC, otherwise the host's local zone is used."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional("utc", ParamKind::Boolean)]
    }

    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let utc = arguments
            .get("utc")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let now = if utc {
            Utc::now().to_rfc3339()
        } else {
            Local::now().to_rfc3339()
        };
        Ok(Value::String(now))
    }
}
