//! Configuration errors

use thiserror::Error;

/// Errors raised while turning descriptors and files into configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported server descriptor: {0}")]
    UnsupportedServerDescriptor(String),

    #[error("Incomplete server config: {0}")]
    IncompleteServerConfig(String),

    #[error("Unsupported transport kind: {0}")]
    UnsupportedTransportKind(String),

    #[error("Invalid timeout: {0} seconds")]
    InvalidTimeout(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Stable name of the error kind, used in diagnostics
    pub fn category(&self) -> &'static str {
        match self {
            ConfigError::UnsupportedServerDescriptor(_) => "UnsupportedServerDescriptor",
            ConfigError::IncompleteServerConfig(_) | ConfigError::InvalidTimeout(_) => {
                "IncompleteServerConfig"
            }
            ConfigError::UnsupportedTransportKind(_) => "UnsupportedTransportKind",
            ConfigError::Io(_) => "Io",
            ConfigError::Parse(_) => "Parse",
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
