//! Live handle to one tool server
//!
//! A `Connection` holds no open session between operations. Every call to
//! `ping`, `list_tools` or `call_tool` opens a session, runs, and closes it
//! again whatever the outcome. Each operation is bounded by the server's
//! timeout and aborted when the connection is closed.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{CallToolRequestParams, ClientRequest};
use rmcp::service::RunningService;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};

use super::error::{McpError, McpResult};
use super::handler::ObservingHandler;
use super::observer::ConnectionObserver;
use super::output::ToolOutput;
use super::server::{RemoteTool, ToolServer};
use crate::config::TransportKind;
use crate::logging::SharedLogger;
use crate::types::CancellationToken;

/// How sessions reach the server
pub(crate) enum Route {
    Http {
        url: String,
        client: reqwest::Client,
    },
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        cwd: Option<PathBuf>,
    },
    InProcess(Arc<dyn ToolServer>),
}

impl Route {
    fn kind(&self) -> TransportKind {
        match self {
            Route::Http { .. } => TransportKind::Http,
            Route::Stdio { .. } => TransportKind::Stdio,
            Route::InProcess(_) => TransportKind::InProcess,
        }
    }
}

/// One open session
enum Session {
    Remote(RunningService<RoleClient, ObservingHandler>),
    Local(Arc<dyn ToolServer>),
}

impl Session {
    async fn ping(&self) -> McpResult<()> {
        match self {
            Session::Remote(service) => service
                .send_request(ClientRequest::PingRequest(Default::default()))
                .await
                .map(|_| ())
                .map_err(|e| McpError::ServerUnreachable(format!("ping failed: {}", e))),
            Session::Local(server) => server.ping().await,
        }
    }

    async fn list_tools(&self) -> McpResult<Vec<RemoteTool>> {
        match self {
            Session::Remote(service) => {
                let tools = service
                    .list_all_tools()
                    .await
                    .map_err(|e| McpError::Protocol(e.to_string()))?;
                Ok(tools.into_iter().map(RemoteTool::from).collect())
            }
            Session::Local(server) => server.list_tools().await,
        }
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> McpResult<ToolOutput> {
        match self {
            Session::Remote(service) => {
                let params = CallToolRequestParams {
                    meta: None,
                    name: name.to_owned().into(),
                    arguments: Some(arguments),
                    task: None,
                };
                let result = service
                    .call_tool(params)
                    .await
                    .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;
                Ok(ToolOutput::from_call_result(result))
            }
            Session::Local(server) => server.call_tool(name, arguments).await.map(ToolOutput::from_value),
        }
    }

    async fn close(self, label: &str, logger: &SharedLogger) {
        if let Session::Remote(service) = self {
            if let Err(e) = service.cancel().await {
                logger.debug(&format!("[{}] Session shutdown error: {}", label, e));
            }
        }
    }
}

/// A tool server reachable through one transport
pub struct Connection {
    label: String,
    route: Route,
    timeout: Option<Duration>,
    observer: Arc<ConnectionObserver>,
    cancel: CancellationToken,
    logger: SharedLogger,
}

impl Connection {
    pub(crate) fn new(
        label: String,
        route: Route,
        timeout: Option<Duration>,
        observer: Arc<ConnectionObserver>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            label,
            route,
            timeout,
            observer,
            cancel: CancellationToken::new(),
            logger,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> TransportKind {
        self.route.kind()
    }

    pub fn observer(&self) -> &Arc<ConnectionObserver> {
        &self.observer
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Liveness check
    pub async fn ping(&self) -> McpResult<()> {
        self.bounded(async {
            let session = self.open().await?;
            let result = session.ping().await;
            session.close(&self.label, &self.logger).await;
            result
        })
        .await
    }

    pub async fn list_tools(&self) -> McpResult<Vec<RemoteTool>> {
        self.bounded(async {
            let session = self.open().await?;
            let result = session.list_tools().await;
            session.close(&self.label, &self.logger).await;
            result
        })
        .await
    }

    /// Ping, then list tools, in one session
    pub async fn probe(&self) -> McpResult<Vec<RemoteTool>> {
        self.bounded(async {
            let session = self.open().await?;
            let result = match session.ping().await {
                Ok(()) => session.list_tools().await,
                Err(e) => Err(e),
            };
            session.close(&self.label, &self.logger).await;
            result
        })
        .await
    }

    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> McpResult<ToolOutput> {
        self.bounded(async {
            let session = self.open().await?;
            let result = session.call_tool(name, arguments).await;
            session.close(&self.label, &self.logger).await;
            result
        })
        .await
    }

    /// Abort in-flight sessions and release the server
    pub async fn close(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if let Route::InProcess(server) = &self.route {
            server.shutdown().await;
        }
        self.logger.debug(&format!("[{}] Connection closed", self.label));
    }

    async fn open(&self) -> McpResult<Session> {
        if self.cancel.is_cancelled() {
            return Err(McpError::ConnectionClosed);
        }
        let handler = ObservingHandler::new(self.observer.clone());

        match &self.route {
            Route::Http { url, client } => {
                let transport = StreamableHttpClientTransport::with_client(
                    client.clone(),
                    StreamableHttpClientTransportConfig::with_uri(url.as_str()),
                );
                let service = handler.serve(transport).await.map_err(|e| {
                    McpError::ServerUnreachable(format!("{}: {}", self.label, e))
                })?;
                Ok(Session::Remote(service))
            }
            Route::Stdio {
                command,
                args,
                env,
                cwd,
            } => {
                let mut cmd = tokio::process::Command::new(command);
                cmd.args(args).envs(env.iter()).stderr(Stdio::inherit());
                if let Some(dir) = cwd {
                    cmd.current_dir(dir);
                }
                let transport = TokioChildProcess::new(cmd).map_err(|e| {
                    McpError::ServerUnreachable(format!("{}: spawn failed: {}", self.label, e))
                })?;
                let service = handler.serve(transport).await.map_err(|e| {
                    McpError::InitializationFailed(format!("{}: {}", self.label, e))
                })?;
                Ok(Session::Remote(service))
            }
            Route::InProcess(server) => Ok(Session::Local(Arc::clone(server))),
        }
    }

    async fn bounded<T>(&self, op: impl Future<Output = McpResult<T>>) -> McpResult<T> {
        let limited = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, op).await {
                    Ok(result) => result,
                    Err(_) => Err(McpError::Timeout(limit)),
                },
                None => op.await,
            }
        };
        self.cancel
            .run_until_cancelled(limited)
            .await
            .unwrap_or(Err(McpError::ConnectionClosed))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("label", &self.label)
            .field("kind", &self.kind())
            .field("closed", &self.is_closed())
            .finish()
    }
}
