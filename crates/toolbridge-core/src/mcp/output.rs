//! Tool results, normalized into one tagged shape

use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Map, Value};

/// What a tool call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The server reported a failure
    Failed(String),
    /// Text content
    Content(String),
    /// A structured object with no error or content field
    Structured(Map<String, Value>),
    /// Anything that is not an object
    Scalar(String),
}

impl ToolOutput {
    /// Classify an arbitrary JSON result
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut object) => {
                if let Some(error) = object.remove("error") {
                    ToolOutput::Failed(value_text(&error))
                } else if let Some(content) = object.remove("content") {
                    ToolOutput::Content(content_text(&content))
                } else {
                    ToolOutput::Structured(object)
                }
            }
            other => ToolOutput::Scalar(value_text(&other)),
        }
    }

    /// Classify an MCP `tools/call` result
    pub fn from_call_result(result: CallToolResult) -> Self {
        let text = result
            .content
            .iter()
            .map(|c| match &c.raw {
                RawContent::Text(t) => t.text.clone(),
                other => serde_json::to_string(other).unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error.unwrap_or(false) {
            return ToolOutput::Failed(text);
        }
        match result.structured_content {
            Some(structured) if text.is_empty() => Self::from_value(structured),
            _ => ToolOutput::Content(text),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutput::Failed(_))
    }

    /// The string placed in the transcript for the model
    pub fn render(&self, tool_name: &str) -> String {
        match self {
            ToolOutput::Failed(message) => format!("Error in {}: {}", tool_name, message),
            ToolOutput::Content(text) | ToolOutput::Scalar(text) => text.clone(),
            ToolOutput::Structured(object) => {
                let value = Value::Object(object.clone());
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Content is either a string or a list of MCP content blocks
fn content_text(content: &Value) -> String {
    match content {
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => value_text(item),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => value_text(other),
    }
}
