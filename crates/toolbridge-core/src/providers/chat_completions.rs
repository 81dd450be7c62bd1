//! OpenAI-compatible Chat Completions client
//!
//! Posts to `{base_url}/chat/completions` without streaming. Tool-call
//! arguments are kept as the raw strings the model produced.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::error::{ProviderError, ProviderResult};
use super::traits::{CompletionRequest, CompletionResponse, Provider};
use crate::logging::Logger;
use crate::types::ChatMessage;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const API_KEY_VAR: &str = "DEEPSEEK_API_KEY";
pub const BASE_URL_VAR: &str = "DEEPSEEK_BASE_URL";

/// Endpoint settings
#[derive(Clone)]
pub struct ProviderSettings {
    /// Name used in errors and logs
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            provider: "deepseek".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Read `DEEPSEEK_API_KEY` and optionally `DEEPSEEK_BASE_URL`
    pub fn from_env() -> ProviderResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ProviderResult<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_api_key("deepseek"))?;
        let mut settings = Self::new(api_key);
        if let Some(base_url) = lookup(BASE_URL_VAR).filter(|u| !u.trim().is_empty()) {
            settings.base_url = base_url;
        }
        Ok(settings)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat Completions provider over reqwest
pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    settings: ProviderSettings,
    logger: Arc<dyn Logger>,
}

impl ChatCompletionsProvider {
    pub fn new(settings: ProviderSettings, logger: Arc<dyn Logger>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            logger,
        }
    }

    /// Build from environment variables
    pub fn from_env(logger: Arc<dyn Logger>) -> ProviderResult<Self> {
        Ok(Self::new(ProviderSettings::from_env()?, logger))
    }

    /// Use a preconfigured HTTP client
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }
}

/// Pull the first choice's message out of a response payload
fn first_message(provider: &str, raw: &Value) -> ProviderResult<ChatMessage> {
    let message = raw
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| ProviderError::invalid_response(provider, "response has no choices"))?;
    Ok(serde_json::from_value(message.clone())?)
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        let url = self.settings.endpoint();
        self.logger.debug(&format!(
            "[ChatCompletions] POST {} model={} messages={} tools={}",
            url,
            request.model,
            request.messages.len(),
            request.tools.as_ref().map_or(0, Vec::len)
        ));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request.to_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::api_error(
                self.settings.provider.clone(),
                status.as_u16(),
                message,
            ));
        }

        let raw: Value = response.json().await?;
        let message = first_message(&self.settings.provider, &raw)?;
        self.logger.debug(&format!(
            "[ChatCompletions] Received message with {} tool calls",
            message.tool_calls.len()
        ));
        Ok(CompletionResponse { message, raw })
    }
}
