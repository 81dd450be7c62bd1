//! Tool-server descriptors and their resolution into `ServerConfig`
//!
//! Callers describe servers loosely: a URL, a script path, a field mapping,
//! an in-process handle, or a ready `ServerConfig`. `resolve_server` is the
//! single place where those shapes become one canonical record. It does no
//! I/O, so it can run ahead of any connection attempt.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::error::{ConfigError, ConfigResult};
use crate::mcp::ToolServer;

/// Default per-operation timeout for a tool server
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Script extensions launched as local subprocess servers
const SCRIPT_INTERPRETERS: &[(&str, &str)] = &[("py", "python"), ("js", "node")];

/// How a connection reaches its server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Streamable HTTP
    Http,
    /// Local subprocess speaking over stdio
    Stdio,
    /// Server living in this process
    InProcess,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::Stdio => "stdio",
            TransportKind::InProcess => "in-process",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" | "https" | "streamable-http" | "streamable_http" => Ok(TransportKind::Http),
            "stdio" | "subprocess" => Ok(TransportKind::Stdio),
            "in-process" | "in_process" | "inprocess" | "memory" => Ok(TransportKind::InProcess),
            other => Err(ConfigError::UnsupportedTransportKind(other.to_string())),
        }
    }
}

/// Where a server lives. Exactly one per config, matching its kind.
#[derive(Clone)]
pub enum Endpoint {
    Http {
        url: String,
        headers: HashMap<String, String>,
    },
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        cwd: Option<PathBuf>,
    },
    InProcess(Arc<dyn ToolServer>),
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Http { url, headers } => f
                .debug_struct("Http")
                .field("url", url)
                // header values may carry credentials
                .field("headers", &headers.keys().collect::<Vec<_>>())
                .finish(),
            Endpoint::Stdio {
                command,
                args,
                env,
                cwd,
            } => f
                .debug_struct("Stdio")
                .field("command", command)
                .field("args", args)
                .field("env", &env.keys().collect::<Vec<_>>())
                .field("cwd", cwd)
                .finish(),
            Endpoint::InProcess(server) => f.debug_tuple("InProcess").field(&server.name()).finish(),
        }
    }
}

/// Canonical description of one tool server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub endpoint: Endpoint,
    pub keep_alive: bool,
    /// Deadline for each remote operation; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl ServerConfig {
    fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            keep_alive: true,
            timeout: Some(DEFAULT_SERVER_TIMEOUT),
        }
    }

    /// A streamable HTTP server
    pub fn http(url: impl Into<String>) -> Self {
        Self::with_endpoint(Endpoint::Http {
            url: url.into(),
            headers: HashMap::new(),
        })
    }

    /// A subprocess server
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::with_endpoint(Endpoint::Stdio {
            command: command.into(),
            args,
            env: HashMap::new(),
            cwd: None,
        })
    }

    /// An in-process server
    pub fn in_process(server: Arc<dyn ToolServer>) -> Self {
        Self::with_endpoint(Endpoint::InProcess(server))
    }

    /// Add an HTTP header (ignored for other kinds)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Endpoint::Http { headers, .. } = &mut self.endpoint {
            headers.insert(name.into(), value.into());
        }
        self
    }

    /// Add a subprocess environment variable (ignored for other kinds)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Endpoint::Stdio { env, .. } = &mut self.endpoint {
            env.insert(key.into(), value.into());
        }
        self
    }

    /// Set the subprocess working directory (ignored for other kinds)
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        if let Endpoint::Stdio { cwd, .. } = &mut self.endpoint {
            *cwd = Some(dir.into());
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The transport kind implied by the endpoint
    pub fn kind(&self) -> TransportKind {
        match &self.endpoint {
            Endpoint::Http { .. } => TransportKind::Http,
            Endpoint::Stdio { .. } => TransportKind::Stdio,
            Endpoint::InProcess(_) => TransportKind::InProcess,
        }
    }

    /// Human-readable identity for log lines
    pub fn label(&self) -> String {
        match &self.endpoint {
            Endpoint::Http { url, .. } => url.clone(),
            Endpoint::Stdio { command, args, .. } => {
                if args.is_empty() {
                    command.clone()
                } else {
                    format!("{} {}", command, args.join(" "))
                }
            }
            Endpoint::InProcess(server) => format!("in-process:{}", server.name()),
        }
    }
}

/// Loose field mapping for one server, as found in config files
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerFields {
    pub url: Option<String>,
    pub headers: HashMap<String, String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
    #[serde(skip)]
    pub handle: Option<Arc<dyn ToolServer>>,
    #[serde(alias = "transport_type")]
    pub transport: Option<String>,
    pub keep_alive: Option<bool>,
    /// Seconds
    pub timeout: Option<f64>,
}

impl std::fmt::Debug for ServerFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerFields")
            .field("url", &self.url)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("handle", &self.handle.as_ref().map(|h| h.name().to_string()))
            .field("transport", &self.transport)
            .field("keep_alive", &self.keep_alive)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Any accepted way of describing a tool server
#[derive(Debug, Clone)]
pub enum ServerDescriptor {
    /// A URL or a script path
    Text(String),
    /// A field mapping
    Fields(ServerFields),
    /// An in-process server handle
    InProcess(Arc<dyn ToolServer>),
    /// An already-canonical config
    Config(ServerConfig),
    /// An untyped entry from a config file
    Raw(Value),
}

impl From<&str> for ServerDescriptor {
    fn from(s: &str) -> Self {
        ServerDescriptor::Text(s.to_string())
    }
}

impl From<String> for ServerDescriptor {
    fn from(s: String) -> Self {
        ServerDescriptor::Text(s)
    }
}

impl From<ServerFields> for ServerDescriptor {
    fn from(fields: ServerFields) -> Self {
        ServerDescriptor::Fields(fields)
    }
}

impl From<ServerConfig> for ServerDescriptor {
    fn from(config: ServerConfig) -> Self {
        ServerDescriptor::Config(config)
    }
}

impl From<Arc<dyn ToolServer>> for ServerDescriptor {
    fn from(server: Arc<dyn ToolServer>) -> Self {
        ServerDescriptor::InProcess(server)
    }
}

impl From<Value> for ServerDescriptor {
    fn from(value: Value) -> Self {
        ServerDescriptor::Raw(value)
    }
}

/// Resolve any descriptor into a canonical `ServerConfig`
pub fn resolve_server(descriptor: &ServerDescriptor) -> ConfigResult<ServerConfig> {
    match descriptor {
        ServerDescriptor::Config(config) => Ok(config.clone()),
        ServerDescriptor::InProcess(server) => Ok(ServerConfig::in_process(Arc::clone(server))),
        ServerDescriptor::Text(text) => resolve_text(text),
        ServerDescriptor::Fields(fields) => resolve_fields(fields),
        ServerDescriptor::Raw(value) => resolve_value(value),
    }
}

/// Surrounding whitespace is ignored when classifying but kept in the address
fn resolve_text(text: &str) -> ConfigResult<ServerConfig> {
    let trimmed = text.trim();
    if has_network_scheme(trimmed) {
        return Ok(ServerConfig::http(text));
    }

    let extension = Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let interpreter = extension.as_deref().and_then(|ext| {
        SCRIPT_INTERPRETERS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, interpreter)| *interpreter)
    });

    match interpreter {
        Some(interpreter) => Ok(ServerConfig::stdio(interpreter, vec![text.to_string()])),
        None => Err(ConfigError::UnsupportedServerDescriptor(format!(
            "'{}' is neither an http(s) URL nor a .py/.js script",
            text
        ))),
    }
}

fn has_network_scheme(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn resolve_fields(fields: &ServerFields) -> ConfigResult<ServerConfig> {
    let kind = match fields.transport.as_deref() {
        Some(tag) => tag.parse::<TransportKind>()?,
        None if fields.url.is_some() => TransportKind::Http,
        None if fields.command.is_some() => TransportKind::Stdio,
        None if fields.handle.is_some() => TransportKind::InProcess,
        None => {
            return Err(ConfigError::IncompleteServerConfig(
                "one of url, command or an in-process handle is required".to_string(),
            ))
        }
    };

    let endpoint = match kind {
        TransportKind::Http => Endpoint::Http {
            url: required(&fields.url, "url", kind)?,
            headers: fields.headers.clone(),
        },
        TransportKind::Stdio => Endpoint::Stdio {
            command: required(&fields.command, "command", kind)?,
            args: fields.args.clone(),
            env: fields.env.clone(),
            cwd: fields.cwd.clone(),
        },
        TransportKind::InProcess => match &fields.handle {
            Some(handle) => Endpoint::InProcess(Arc::clone(handle)),
            None => {
                return Err(ConfigError::IncompleteServerConfig(
                    "in-process transport requires a server handle".to_string(),
                ))
            }
        },
    };

    let timeout = match fields.timeout {
        None => Some(DEFAULT_SERVER_TIMEOUT),
        Some(secs) => Some(
            Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidTimeout(secs))?,
        ),
    };

    Ok(ServerConfig {
        endpoint,
        keep_alive: fields.keep_alive.unwrap_or(true),
        timeout,
    })
}

fn required(field: &Option<String>, name: &str, kind: TransportKind) -> ConfigResult<String> {
    field
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| {
            ConfigError::IncompleteServerConfig(format!("{} transport requires '{}'", kind, name))
        })
}

fn resolve_value(value: &Value) -> ConfigResult<ServerConfig> {
    match value {
        Value::String(text) => resolve_text(text),
        Value::Object(_) => {
            let fields: ServerFields = serde_json::from_value(value.clone())
                .map_err(|e| ConfigError::UnsupportedServerDescriptor(e.to_string()))?;
            resolve_fields(&fields)
        }
        other => Err(ConfigError::UnsupportedServerDescriptor(format!(
            "expected a string or a mapping, got {}",
            other
        ))),
    }
}
