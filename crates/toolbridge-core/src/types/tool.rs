//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Model-facing tool definition
///
/// Derived from a tool server's raw descriptor. `name` is the registry key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    pub parameters: Value,
}

impl Tool {
    /// Create a new tool definition with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_object_schema(),
        }
    }

    /// Set the parameter schema
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Build a descriptor from a server's raw tool listing
    ///
    /// A missing description becomes `"Tool: {name}"`; a missing or empty
    /// schema becomes `{"type": "object", "properties": {}}`.
    pub fn from_remote(
        name: impl Into<String>,
        description: Option<String>,
        input_schema: Option<Value>,
    ) -> Self {
        let name = name.into();
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Tool: {}", name));
        let parameters = match input_schema {
            Some(Value::Object(map)) if !map.is_empty() => Value::Object(map),
            _ => empty_object_schema(),
        };
        Self {
            name,
            description,
            parameters,
        }
    }

    /// The chat-completions function schema for this tool
    pub fn to_function_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn function_kind() -> String {
    "function".to_string()
}

/// Function name and raw JSON arguments of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments exactly as the model produced them (a JSON string)
    #[serde(default)]
    pub arguments: String,
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Name of the tool being called
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Parse the argument string into a JSON object
    ///
    /// Anything that is not a JSON object is rejected.
    pub fn parse_arguments(&self) -> Result<Map<String, Value>, serde_json::Error> {
        serde_json::from_str::<Map<String, Value>>(&self.function.arguments)
    }
}
