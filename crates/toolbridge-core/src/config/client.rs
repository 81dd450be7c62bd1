//! Client configuration

use super::server::ServerDescriptor;
use crate::logging::LogLevel;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and friendly assistant.";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Everything an `AgentClient` needs besides its model provider
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub model: String,
    pub system_prompt: String,
    /// Zero servers means direct mode
    pub servers: Vec<ServerDescriptor>,
    /// Forward server log messages to the logger
    pub enable_logging: bool,
    /// Forward server progress notifications to the logger
    pub enable_progress: bool,
    pub log_level: LogLevel,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ClientConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            servers: Vec::new(),
            enable_logging: false,
            enable_progress: false,
            log_level: LogLevel::Info,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_server(mut self, server: impl Into<ServerDescriptor>) -> Self {
        self.servers.push(server.into());
        self
    }

    pub fn with_servers<I, D>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<ServerDescriptor>,
    {
        self.servers.extend(servers.into_iter().map(Into::into));
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.enable_progress = enabled;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
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

    /// No servers configured: requests go straight to the model
    pub fn is_direct(&self) -> bool {
        self.servers.is_empty()
    }
}
