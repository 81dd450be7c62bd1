//! Tool-server errors

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors from tool-server connections
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl McpError {
    pub fn category(&self) -> &'static str {
        match self {
            McpError::ServerUnreachable(_)
            | McpError::InitializationFailed(_)
            | McpError::Timeout(_)
            | McpError::ConnectionClosed
            | McpError::Io(_) => "ServerUnreachable",
            McpError::ToolNotFound(_) => "ToolNotFound",
            McpError::ToolCallFailed(_) => "ToolInvocationError",
            McpError::Protocol(_) => "Protocol",
            McpError::Config(e) => e.category(),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
