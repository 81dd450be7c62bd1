//! Toolbridge Core
//!
//! Client-side orchestration between a language model and the tool servers
//! it can call. Servers are reached over streamable HTTP, as stdio
//! subprocesses, or in-process; the model through any `Provider`.
//!
//! ## Tool Orchestration
//!
//! `AgentClient::execute` connects the `ToolRegistry` on first use, offers
//! every discovered tool to the model, runs the tool calls it asks for and
//! folds their results into a second completion:
//!
//! ```rust,ignore
//! use toolbridge_core::{AgentClient, ClientConfig};
//!
//! let config = ClientConfig::new("deepseek-chat")
//!     .with_server("http://localhost:8000/mcp/")
//!     .with_server("servers/weather.py");
//! let client = AgentClient::from_env(config)?;
//!
//! let result = client.execute("What's the weather in Lima?").await;
//! if result.success {
//!     println!("{} (tools: {:?})", result.output, result.tools_used);
//! }
//! client.close().await;
//! ```

pub mod client;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod providers;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatMessage, ExecutionResult, FunctionCall, MessageRole, Tool, ToolCall,
};

pub use logging::{ConsoleLogger, LogLevel, Logger, NoOpLogger, SharedLogger};

pub use config::{
    resolve_server, ClientConfig, ConfigError, ConfigFile, ServerConfig, ServerDescriptor,
    TransportKind,
};

pub use mcp::{McpError, McpResult, MemoryToolServer, RemoteTool, ToolOutput, ToolServer};

pub use providers::{
    ChatCompletionsProvider, MockProvider, MockReply, Provider, ProviderError, ProviderResult,
    ProviderSettings,
};

pub use tools::{ClientStats, ToolRegistry};

pub use client::{AgentClient, Phase, EMPTY_RESPONSE};
