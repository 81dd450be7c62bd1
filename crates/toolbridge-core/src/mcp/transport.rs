//! Builds connections from resolved server configs

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::connection::{Connection, Route};
use super::error::{McpError, McpResult};
use super::observer::{ConnectionObserver, ForwardingOptions, ObserverSet};
use crate::config::{ConfigError, Endpoint, ServerConfig};
use crate::logging::SharedLogger;

const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// Turns a `ServerConfig` into an unopened `Connection`
///
/// Every observer it creates is registered in the shared `ObserverSet`, so
/// the registry can sweep them for list-change flags.
pub struct TransportFactory {
    observers: ObserverSet,
    forwarding: ForwardingOptions,
    logger: SharedLogger,
}

impl TransportFactory {
    pub fn new(observers: ObserverSet, forwarding: ForwardingOptions, logger: SharedLogger) -> Self {
        Self {
            observers,
            forwarding,
            logger,
        }
    }

    /// Build a connection. Nothing is opened here.
    pub fn build(&self, config: &ServerConfig) -> McpResult<Connection> {
        let label = config.label();
        let observer = Arc::new(ConnectionObserver::new(
            label.clone(),
            self.forwarding,
            self.logger.clone(),
        ));

        let route = match &config.endpoint {
            Endpoint::Http { url, headers } => Route::Http {
                url: url.clone(),
                client: http_client(config, headers)?,
            },
            Endpoint::Stdio {
                command,
                args,
                env,
                cwd,
            } => Route::Stdio {
                command: command.clone(),
                args: args.clone(),
                env: env.clone(),
                cwd: cwd.clone(),
            },
            Endpoint::InProcess(server) => {
                server.attach(observer.clone());
                Route::InProcess(Arc::clone(server))
            }
        };

        self.observers.register(observer.clone());
        self.logger.debug(&format!(
            "[TransportFactory] Built {} connection for {}",
            config.kind(),
            label
        ));
        Ok(Connection::new(label, route, config.timeout, observer, self.logger.clone()))
    }
}

fn http_client(
    config: &ServerConfig,
    headers: &std::collections::HashMap<String, String>,
) -> McpResult<reqwest::Client> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::IncompleteServerConfig(format!("invalid header name '{}': {}", name, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ConfigError::IncompleteServerConfig(format!("invalid value for header '{}': {}", name, e))
        })?;
        header_map.insert(header_name, header_value);
    }

    let mut builder = reqwest::Client::builder().default_headers(header_map);
    builder = if config.keep_alive {
        builder.tcp_keepalive(TCP_KEEPALIVE)
    } else {
        builder.pool_max_idle_per_host(0)
    };
    if let Some(timeout) = config.timeout {
        // Whole-operation deadlines are enforced by the connection
        builder = builder.connect_timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| McpError::InitializationFailed(format!("build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportKind;
    use crate::logging::NoOpLogger;
    use crate::mcp::MemoryToolServer;

    fn factory(observers: &ObserverSet) -> TransportFactory {
        TransportFactory::new(observers.clone(), ForwardingOptions::default(), NoOpLogger::shared())
    }

    #[test]
    fn test_build_registers_observer() {
        let observers = ObserverSet::new();
        let factory = factory(&observers);

        let http = factory.build(&ServerConfig::http("http://localhost:1/mcp")).unwrap();
        let stdio = factory
            .build(&ServerConfig::stdio("python", vec!["srv.py".into()]))
            .unwrap();
        assert_eq!(http.kind(), TransportKind::Http);
        assert_eq!(stdio.kind(), TransportKind::Stdio);
        assert_eq!(stdio.label(), "python srv.py");
        assert_eq!(observers.len(), 2);
    }

    #[test]
    fn test_in_process_server_receives_observer() {
        let observers = ObserverSet::new();
        let server = Arc::new(MemoryToolServer::new("mem"));
        factory(&observers)
            .build(&ServerConfig::in_process(server.clone()))
            .unwrap();

        server.notify_tool_list_changed();
        assert!(observers.any_tools_changed());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let observers = ObserverSet::new();
        let config = ServerConfig::http("http://localhost:1/mcp").with_header("bad header", "x");
        let err = factory(&observers).build(&config).unwrap_err();
        assert_eq!(err.category(), "IncompleteServerConfig");
        assert!(observers.is_empty());
    }
}
