//! Tool registry
//!
//! Connects every configured server once, keeps the model-facing tool list
//! and the tool-name to connection mapping, and routes tool calls.
//! Mutation (`connect_all`, `refresh`, `close`) is serialized by one async
//! lock; `call_tool` only takes a short read of the owner map.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{resolve_server, ServerDescriptor};
use crate::logging::{LoggerExt, SharedLogger};
use crate::mcp::{
    Connection, ForwardingOptions, McpError, McpResult, ObserverSet, ToolOutput, TransportFactory,
};
use crate::types::Tool;

/// Snapshot of registry and connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub servers_configured: usize,
    pub servers_connected: usize,
    pub tools_available: usize,
    pub is_connected: bool,
}

/// Tools and their owners; owner keys always match tool names
#[derive(Default)]
struct ToolTable {
    tools: Vec<Tool>,
    owner: HashMap<String, Arc<Connection>>,
}

impl ToolTable {
    fn install(&mut self, connection: &Arc<Connection>, tools: Vec<Tool>, logger: &SharedLogger) {
        for tool in tools {
            let name = tool.name.clone();
            match self.tools.iter().position(|t| t.name == name) {
                Some(index) => {
                    if let Some(previous) = self.owner.get(&name) {
                        logger.debug(&format!(
                            "[ToolRegistry] Tool '{}' from {} overrides {}",
                            name,
                            connection.label(),
                            previous.label()
                        ));
                    }
                    self.tools[index] = tool;
                }
                None => self.tools.push(tool),
            }
            self.owner.insert(name, Arc::clone(connection));
        }
    }
}

#[derive(Default)]
struct RegistryState {
    connections: Vec<Arc<Connection>>,
    table: ToolTable,
    connected: bool,
}

pub struct ToolRegistry {
    servers: Vec<ServerDescriptor>,
    state: RwLock<RegistryState>,
    lifecycle: tokio::sync::Mutex<()>,
    observers: ObserverSet,
    factory: TransportFactory,
    logger: SharedLogger,
}

impl ToolRegistry {
    pub fn new(
        servers: Vec<ServerDescriptor>,
        forwarding: ForwardingOptions,
        logger: SharedLogger,
    ) -> Self {
        let observers = ObserverSet::new();
        Self {
            servers,
            state: RwLock::new(RegistryState::default()),
            lifecycle: tokio::sync::Mutex::new(()),
            factory: TransportFactory::new(observers.clone(), forwarding, logger.clone()),
            observers,
            logger,
        }
    }

    /// Connect every configured server, once
    ///
    /// Servers that fail to resolve, build, answer a ping or list their
    /// tools are logged and skipped. The registry counts as connected
    /// afterwards even if every server failed; nothing is retried until
    /// `close` resets it.
    pub async fn connect_all(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.state.read().connected || self.servers.is_empty() {
            return;
        }

        self.logger.info(&format!(
            "[ToolRegistry] Connecting to {} servers",
            self.servers.len()
        ));

        for descriptor in &self.servers {
            match self.connect_one(descriptor).await {
                Ok((connection, tools)) => {
                    self.logger.info(&format!(
                        "[ToolRegistry] {}: {} tools",
                        connection.label(),
                        tools.len()
                    ));
                    let mut state = self.state.write();
                    state.table.install(&connection, tools, &self.logger);
                    state.connections.push(connection);
                }
                Err(e) => {
                    self.logger.error(&format!(
                        "[ToolRegistry] Skipping server {:?}: {}",
                        descriptor, e
                    ));
                }
            }
        }

        let mut state = self.state.write();
        state.connected = true;
        self.logger.info(&format!(
            "[ToolRegistry] Connected. {} tools available",
            state.table.tools.len()
        ));
    }

    async fn connect_one(
        &self,
        descriptor: &ServerDescriptor,
    ) -> McpResult<(Arc<Connection>, Vec<Tool>)> {
        let config = resolve_server(descriptor)?;
        let connection = Arc::new(self.factory.build(&config)?);
        let advertised = connection.probe().await?;
        self.logger.debug(&format!(
            "[ToolRegistry] {} answered ping with {} tools",
            connection.label(),
            advertised.len()
        ));
        let tools = Self::load_tools(&connection).await?;
        Ok((connection, tools))
    }

    /// List a connection's tools in model-facing form
    async fn load_tools(connection: &Connection) -> McpResult<Vec<Tool>> {
        let remote = connection.list_tools().await?;
        Ok(remote
            .into_iter()
            .map(|t| Tool::from_remote(t.name, t.description, t.input_schema))
            .collect())
    }

    /// Reload every held connection's tools if any server announced a change
    ///
    /// Returns whether a reload happened. Servers that failed to connect are
    /// not retried.
    pub async fn refresh(&self) -> bool {
        let _guard = self.lifecycle.lock().await;
        if !self.observers.any_tools_changed() {
            return false;
        }
        // Cleared first so a change announced mid-reload is not lost
        self.observers.clear_flags();

        let connections = self.state.read().connections.clone();
        let mut table = ToolTable::default();
        for connection in &connections {
            match Self::load_tools(connection).await {
                Ok(tools) => table.install(connection, tools, &self.logger),
                Err(e) => self.logger.warn(&format!(
                    "[ToolRegistry] Failed to reload tools from {}: {}",
                    connection.label(),
                    e
                )),
            }
        }

        let count = table.tools.len();
        self.state.write().table = table;
        self.logger
            .info_fmt(format_args!("[ToolRegistry] Refreshed. {} tools available", count));
        true
    }

    /// Call a tool, returning its typed output
    pub async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> McpResult<ToolOutput> {
        let connection = self
            .state
            .read()
            .table
            .owner
            .get(name)
            .cloned()
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        self.logger.info(&format!("[ToolRegistry] Calling tool: {}", name));
        connection.call_tool(name, arguments).await
    }

    /// Call a tool, returning the text the model should see
    ///
    /// Never fails: a missing tool or a failed call becomes an error string.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> String {
        match self.invoke(name, arguments).await {
            Ok(output) => {
                if output.is_failure() {
                    self.logger
                        .warn(&format!("[ToolRegistry] Tool {} reported an error", name));
                }
                output.render(name)
            }
            Err(McpError::ToolNotFound(_)) => format!("Error: tool {} not found", name),
            Err(e) => {
                self.logger
                    .warn(&format!("[ToolRegistry] Tool {} failed: {}", name, e));
                format!("Error executing {}: {}", name, e)
            }
        }
    }

    /// Close every connection and forget all state
    pub async fn close(&self) {
        let _guard = self.lifecycle.lock().await;
        let connections = {
            let mut state = self.state.write();
            state.table = ToolTable::default();
            state.connected = false;
            std::mem::take(&mut state.connections)
        };
        join_all(connections.iter().map(|c| c.close())).await;
        self.observers.reset();
        if !connections.is_empty() {
            self.logger.info(&format!(
                "[ToolRegistry] Closed {} connections",
                connections.len()
            ));
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    pub fn has_connections(&self) -> bool {
        !self.state.read().connections.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.state.read().connections.len()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Tool names in registry order
    pub fn available_tools(&self) -> Vec<String> {
        self.state
            .read()
            .table
            .tools
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn tool_schemas(&self) -> Vec<Tool> {
        self.state.read().table.tools.clone()
    }

    pub fn tool_count(&self) -> usize {
        self.state.read().table.tools.len()
    }

    /// Label of the connection that owns `name`
    pub fn owner_of(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .table
            .owner
            .get(name)
            .map(|c| c.label().to_string())
    }

    pub fn stats(&self) -> ClientStats {
        let state = self.state.read();
        ClientStats {
            servers_configured: self.servers.len(),
            servers_connected: state.connections.len(),
            tools_available: state.table.tools.len(),
            is_connected: state.connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::{MemoryToolServer, RemoteTool, ToolServer};
    use serde_json::json;

    fn server(name: &str, tools: &[&str]) -> Arc<MemoryToolServer> {
        let mut server = MemoryToolServer::new(name);
        for tool in tools {
            let reply = format!("{} from {}", tool, name);
            server = server.with_tool(RemoteTool::new(*tool), move |_| Ok(json!(reply.clone())));
        }
        Arc::new(server)
    }

    fn descriptor(server: &Arc<MemoryToolServer>) -> ServerDescriptor {
        let handle: Arc<dyn ToolServer> = server.clone();
        ServerDescriptor::InProcess(handle)
    }

    fn registry(servers: Vec<ServerDescriptor>) -> ToolRegistry {
        ToolRegistry::new(servers, ForwardingOptions::default(), NoOpLogger::shared())
    }

    #[tokio::test]
    async fn test_connect_all_loads_tools_with_defaults() {
        let a = Arc::new(MemoryToolServer::new("a").with_tool(
            RemoteTool::new("search")
                .with_description("Search the catalog")
                .with_input_schema(json!({"type": "object", "properties": {"q": {"type": "string"}}})),
            |_| Ok(json!("ok")),
        ).with_tool(RemoteTool::new("bare"), |_| Ok(json!("ok"))));
        let registry = registry(vec![descriptor(&a)]);
        registry.connect_all().await;

        let schemas = registry.tool_schemas();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].description, "Search the catalog");
        assert_eq!(schemas[1].description, "Tool: bare");
        assert_eq!(schemas[1].parameters, json!({"type": "object", "properties": {}}));
        assert!(registry.is_connected());
    }

    #[tokio::test]
    async fn test_connect_all_is_idempotent() {
        let a = server("a", &["x", "y"]);
        let registry = registry(vec![descriptor(&a)]);
        registry.connect_all().await;
        let first = registry.tool_schemas();
        registry.connect_all().await;
        assert_eq!(registry.tool_schemas(), first);
        assert_eq!(registry.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_no_servers_is_noop() {
        let registry = registry(vec![]);
        registry.connect_all().await;
        assert!(!registry.is_connected());
        assert!(registry.available_tools().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_tool_last_server_wins() {
        let a = server("a", &["x", "only_a"]);
        let b = server("b", &["x"]);
        let registry = registry(vec![descriptor(&a), descriptor(&b)]);
        registry.connect_all().await;

        assert_eq!(registry.available_tools(), vec!["x", "only_a"]);
        assert_eq!(registry.owner_of("x").as_deref(), Some("in-process:b"));
        assert_eq!(registry.call_tool("x", Map::new()).await, "x from b");
    }

    #[tokio::test]
    async fn test_failing_servers_are_skipped() {
        let down = server("down", &["lost"]);
        down.set_reachable(false);
        let up = server("up", &["kept"]);
        let registry = registry(vec![
            ServerDescriptor::Raw(json!(123)),
            "server.rb".into(),
            descriptor(&down),
            descriptor(&up),
        ]);
        registry.connect_all().await;

        assert!(registry.is_connected());
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.available_tools(), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_all_servers_failing_still_connected() {
        let down = server("down", &["lost"]);
        down.set_reachable(false);
        let registry = registry(vec![descriptor(&down)]);
        registry.connect_all().await;
        assert!(registry.is_connected());

        // not retried
        down.set_reachable(true);
        registry.connect_all().await;
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_tool_returns_error_string() {
        let registry = registry(vec![descriptor(&server("a", &["x"]))]);
        registry.connect_all().await;
        let output = registry.call_tool("missing-tool", Map::new()).await;
        assert_eq!(output, "Error: tool missing-tool not found");
    }

    #[tokio::test]
    async fn test_tool_errors_become_strings() {
        let a = Arc::new(
            MemoryToolServer::new("a")
                .with_tool(RemoteTool::new("reported"), |_| Ok(json!({"error": "quota exceeded"})))
                .with_tool(RemoteTool::new("raised"), |_| {
                    Err(McpError::ToolCallFailed("disk full".into()))
                }),
        );
        let registry = registry(vec![descriptor(&a)]);
        registry.connect_all().await;

        assert_eq!(
            registry.call_tool("reported", Map::new()).await,
            "Error in reported: quota exceeded"
        );
        assert_eq!(
            registry.call_tool("raised", Map::new()).await,
            "Error executing raised: Tool call failed: disk full"
        );
    }

    #[tokio::test]
    async fn test_refresh_after_tool_list_change() {
        let a = server("a", &["x"]);
        let registry = registry(vec![descriptor(&a)]);
        registry.connect_all().await;

        assert!(!registry.refresh().await);

        a.add_tool(RemoteTool::new("y"), |_| Ok(json!("y")));
        assert_eq!(registry.available_tools(), vec!["x"]);
        a.notify_tool_list_changed();

        assert!(registry.refresh().await);
        assert_eq!(registry.available_tools(), vec!["x", "y"]);
        assert!(!registry.refresh().await);
    }

    #[tokio::test]
    async fn test_refresh_drops_removed_tools() {
        let a = server("a", &["x", "y"]);
        let registry = registry(vec![descriptor(&a)]);
        registry.connect_all().await;

        a.remove_tool("x");
        a.notify_tool_list_changed();
        registry.refresh().await;
        assert_eq!(registry.available_tools(), vec!["y"]);
        assert!(registry.owner_of("x").is_none());
    }

    #[tokio::test]
    async fn test_close_then_reconnect() {
        let a = server("a", &["x", "y"]);
        let b = server("b", &["z"]);
        let registry = registry(vec![descriptor(&a), descriptor(&b)]);
        registry.connect_all().await;
        let before = registry.tool_schemas();

        registry.close().await;
        assert!(!registry.is_connected());
        assert!(registry.available_tools().is_empty());
        assert_eq!(a.shutdown_count(), 1);
        assert_eq!(b.shutdown_count(), 1);

        registry.connect_all().await;
        assert_eq!(registry.tool_schemas(), before);
        assert_eq!(registry.call_tool("z", Map::new()).await, "z from b");
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = registry(vec![descriptor(&server("a", &["x", "y"])), "bad.txt".into()]);
        registry.connect_all().await;
        assert_eq!(
            registry.stats(),
            ClientStats {
                servers_configured: 2,
                servers_connected: 1,
                tools_available: 2,
                is_connected: true,
            }
        );
    }

    #[tokio::test]
    async fn test_http_server_round_trip() {
        let url = crate::mcp::testing::spawn_echo_server().await;
        let registry = registry(vec![ServerDescriptor::from(url.as_str())]);
        registry.connect_all().await;

        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.available_tools(), vec!["echo", "fail", "announce"]);
        assert_eq!(registry.owner_of("echo").as_deref(), Some(url.as_str()));

        let mut args = Map::new();
        args.insert("q".into(), json!("hi"));
        assert_eq!(registry.call_tool("echo", args).await, "echo hi");
        assert_eq!(registry.call_tool("fail", Map::new()).await, "Error in fail: boom");
        assert!(!registry.refresh().await);

        assert_eq!(registry.call_tool("announce", Map::new()).await, "announced");
        let mut refreshed = false;
        for _ in 0..50 {
            if registry.refresh().await {
                refreshed = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(refreshed);
        assert_eq!(registry.tool_count(), 3);

        registry.close().await;
        assert!(!registry.has_connections());
    }
}
