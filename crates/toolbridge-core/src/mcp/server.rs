//! In-process tool servers

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::McpResult;
use super::observer::ServerObserver;

/// A tool as advertised by a server, before model-facing defaults apply
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

impl RemoteTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

impl From<rmcp::model::Tool> for RemoteTool {
    fn from(tool: rmcp::model::Tool) -> Self {
        // rmcp always carries a schema; an empty one means the server sent none
        let input_schema = if tool.input_schema.is_empty() {
            None
        } else {
            Some(Value::Object(tool.input_schema.as_ref().clone()))
        };
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()),
            input_schema,
        }
    }
}

/// A tool server living in this process
///
/// Results may be any JSON value. Objects with an `error` field are treated
/// as failures, objects with a `content` field are unwrapped, anything else
/// is passed to the model as-is.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str;

    async fn ping(&self) -> McpResult<()> {
        Ok(())
    }

    async fn list_tools(&self) -> McpResult<Vec<RemoteTool>>;

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> McpResult<Value>;

    /// Receive the observer for server-pushed notifications
    fn attach(&self, _observer: Arc<dyn ServerObserver>) {}

    /// Called once when the owning connection closes
    async fn shutdown(&self) {}
}

impl std::fmt::Debug for dyn ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer").field("name", &self.name()).finish()
    }
}
