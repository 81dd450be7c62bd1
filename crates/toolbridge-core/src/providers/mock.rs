//! Mock provider for testing
//!
//! Replays scripted replies in order and records every request, so tests can
//! count completion calls and inspect what was sent. Once the script runs
//! out it echoes the last user message.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use super::error::{ProviderError, ProviderResult};
use super::traits::{CompletionRequest, CompletionResponse, Provider};
use crate::logging::Logger;
use crate::types::{ChatMessage, MessageRole, ToolCall};

/// One scripted completion outcome
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain text answer
    Text(String),
    /// Tool-call request, optionally with accompanying text
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Assistant message with no content at all
    Empty,
    /// Fail the request
    Error(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        MockReply::ToolCalls {
            content: None,
            calls,
        }
    }
}

/// Mock LLM provider for testing
pub struct MockProvider {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    /// Create an echo provider
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::scripted(Vec::new(), logger)
    }

    /// Replay `replies` in order, then echo
    pub fn scripted(replies: Vec<MockReply>, logger: Arc<dyn Logger>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Create a fixed response provider (one reply)
    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::scripted(vec![MockReply::text(response)], logger)
    }

    /// Create a provider whose first request fails
    pub fn error(message: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::scripted(vec![MockReply::Error(message.into())], logger)
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_user_message(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .and_then(|m| m.text())
            .unwrap_or("Hello from MockProvider!")
            .to_string()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        let reply = self.script.lock().pop_front();
        self.logger.debug(&format!(
            "MockProvider: request {} with {} messages, reply {:?}",
            self.request_count() + 1,
            request.messages.len(),
            reply
        ));
        let echo = format!("Echo: {}", Self::last_user_message(&request.messages));
        self.requests.lock().push(request);

        let message = match reply {
            None => ChatMessage::assistant(echo),
            Some(MockReply::Text(text)) => ChatMessage::assistant(text),
            Some(MockReply::ToolCalls { content, calls }) => {
                ChatMessage::assistant_tool_calls(content, calls)
            }
            Some(MockReply::Empty) => ChatMessage::assistant_tool_calls(None, Vec::new()),
            Some(MockReply::Error(message)) => {
                return Err(ProviderError::Other(format!("Mock error: {}", message)))
            }
        };

        let finish_reason = if message.has_tool_calls() {
            "tool_calls"
        } else {
            "stop"
        };
        let raw = json!({
            "id": format!("mock-{}", self.request_count()),
            "object": "chat.completion",
            "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        });
        Ok(CompletionResponse { message, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    fn request(content: &str) -> CompletionRequest {
        CompletionRequest::new("mock-model", vec![ChatMessage::user(content)])
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let provider = MockProvider::new(NoOpLogger::shared());
        let response = provider.complete(request("Hello, world!")).await.unwrap();
        assert_eq!(response.message.text(), Some("Echo: Hello, world!"));
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_script_then_echo() {
        let provider = MockProvider::scripted(
            vec![
                MockReply::tool_calls(vec![ToolCall::new("c1", "search", "{}")]),
                MockReply::text("done"),
            ],
            NoOpLogger::shared(),
        );
        let first = provider.complete(request("a")).await.unwrap();
        assert!(first.message.has_tool_calls());
        assert_eq!(first.raw["choices"][0]["finish_reason"], "tool_calls");

        let second = provider.complete(request("b")).await.unwrap();
        assert_eq!(second.message.text(), Some("done"));

        let third = provider.complete(request("c")).await.unwrap();
        assert_eq!(third.message.text(), Some("Echo: c"));
    }

    #[tokio::test]
    async fn test_error_mode() {
        let provider = MockProvider::error("Test error message", NoOpLogger::shared());
        let err = provider.complete(request("x")).await.unwrap_err();
        assert!(err.to_string().contains("Test error message"));
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let provider = MockProvider::scripted(vec![MockReply::Empty], NoOpLogger::shared());
        let response = provider.complete(request("x")).await.unwrap();
        assert_eq!(response.message.text(), None);
        assert!(!response.message.has_tool_calls());
    }
}
