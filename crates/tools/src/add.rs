//! Integer addition, the smallest useful tool.

use async_trait::async_trait;
use reactor_core::error::ToolError;
use reactor_core::tool::{Arguments, ParamKind, ParamSpec, Tool};
use serde_json::Value;

pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add two integers and return their sum."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("a", ParamKind::Integer).with_description("first addend"),
            ParamSpec::required("b", ParamKind::Integer).with_description("second addend"),
        ]
    }

    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let a = integer(arguments, "a")?;
        let b = integer(arguments, "b")?;
        a.checked_add(b)
            .map(Value::from)
            .ok_or_else(|| ToolError::failed("add", format!("{a} + {b} overflows")))
    }
}

fn integer(arguments: &Arguments, key: &str) -> Result<i64, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::invalid("add", format!("'{key}' must be an integer")))
}
