//! Outcome of one `execute` call

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Result of executing one instruction
///
/// Built once per call and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Final answer text; empty when the call failed
    pub output: String,
    pub success: bool,
    /// Short random token identifying this execution
    pub execution_id: String,
    /// When the execution started
    pub timestamp: DateTime<Utc>,
    /// Tool names invoked this turn, in model order
    pub tools_used: Vec<String>,
    /// Diagnostic fields (model, duration, counts, error category)
    pub metadata: Map<String, Value>,
    /// Last completion payload, when one was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Generate a fresh execution id (8 hex characters)
    pub fn new_execution_id() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    /// Whether the model answered without requesting any tool
    pub fn is_direct(&self) -> bool {
        self.metadata
            .get("direct_response")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
