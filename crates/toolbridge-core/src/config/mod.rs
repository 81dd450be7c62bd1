//! Configuration
//!
//! - `ServerConfig`: canonical tool-server record, built by `resolve_server`
//! - `ClientConfig`: model, prompt and server list for an `AgentClient`
//! - `ConfigFile`: YAML file form (user/workspace level)

mod client;
mod error;
mod file;
mod server;

pub use client::{ClientConfig, DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE};
pub use error::{ConfigError, ConfigResult};
pub use file::{ConfigFile, ConfigLevel};
pub use server::{
    resolve_server, Endpoint, ServerConfig, ServerDescriptor, ServerFields, TransportKind,
    DEFAULT_SERVER_TIMEOUT,
};
