//! Helpers for reading tool arguments

use crate::error::{ToolError, ToolResult};
use crate::tool::Arguments;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize the whole argument map into a typed request.
pub fn parse<T: DeserializeOwned>(tool: &str, args: &Arguments) -> ToolResult<T> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::invalid_arguments(tool, e))
}

/// Read a required string argument.
pub fn required_str<'a>(tool: &str, args: &'a Arguments, key: &str) -> ToolResult<&'a str> {
    match args.get(key) {
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(ToolError::invalid_arguments(
            tool,
            format!("'{key}' must be a string, got {other}"),
        )),
        None => Err(ToolError::invalid_arguments(
            tool,
            format!("missing required argument '{key}'"),
        )),
    }
}

/// Read an optional string argument. `null` counts as absent.
pub fn optional_str<'a>(tool: &str, args: &'a Arguments, key: &str) -> ToolResult<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_str(tool, args, key).map(Some),
    }
}

/// Read a required array of strings.
pub fn string_list(tool: &str, args: &Arguments, key: &str) -> ToolResult<Vec<String>> {
    let items = args
        .get(key)
        .ok_or_else(|| {
            ToolError::invalid_arguments(tool, format!("missing required argument '{key}'"))
        })?
        .as_array()
        .ok_or_else(|| ToolError::invalid_arguments(tool, format!("'{key}' must be an array")))?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ToolError::invalid_arguments(tool, format!("'{key}' must contain only strings"))
            })
        })
        .collect()
}
