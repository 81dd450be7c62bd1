//! Provider trait definition

use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::ProviderResult;
use crate::config::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::types::{ChatMessage, Tool};

/// One non-streaming completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier as used by the provider's API
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// `None` omits the field entirely; never `Some(vec![])`
    pub tools: Option<Vec<Tool>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Attach tool schemas; an empty list leaves the field out
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Request body in the chat-completions wire shape
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if let Some(tools) = &self.tools {
            body["tools"] = Value::Array(tools.iter().map(Tool::to_function_schema).collect());
        }
        body
    }
}

/// First choice of a completion
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: ChatMessage,
    /// Full provider payload
    pub raw: Value,
}

/// The language-model completion endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name (e.g., "deepseek", "mock")
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tools_omitted() {
        let request = CompletionRequest::new("m", vec![ChatMessage::user("hi")]).with_tools(vec![]);
        let body = request.to_body();
        assert!(body.get("tools").is_none());
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_tools_serialized_as_functions() {
        let request = CompletionRequest::new("m", vec![])
            .with_tools(vec![Tool::new("search", "Search things")])
            .with_max_tokens(10);
        let body = request.to_body();
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "search");
        assert_eq!(body["max_tokens"], 10);
    }
}
