//! In-process tool server built from closures
//!
//! Useful for embedding local tools next to remote ones, and as the tool
//! server double in tests.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use super::error::{McpError, McpResult};
use super::observer::ServerObserver;
use super::server::{RemoteTool, ToolServer};
use crate::logging::LogLevel;

type ToolFn = Arc<dyn Fn(Map<String, Value>) -> BoxFuture<'static, McpResult<Value>> + Send + Sync>;

pub struct MemoryToolServer {
    name: String,
    tools: RwLock<Vec<(RemoteTool, ToolFn)>>,
    observer: RwLock<Option<Arc<dyn ServerObserver>>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    reachable: AtomicBool,
    shutdowns: AtomicUsize,
}

impl MemoryToolServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: RwLock::new(Vec::new()),
            observer: RwLock::new(None),
            calls: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Register a synchronous tool
    pub fn with_tool<F>(self, tool: RemoteTool, handler: F) -> Self
    where
        F: Fn(Map<String, Value>) -> McpResult<Value> + Send + Sync + 'static,
    {
        self.add_tool(tool, handler);
        self
    }

    /// Register an async tool
    pub fn with_async_tool<F, Fut>(self, tool: RemoteTool, handler: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<Value>> + Send + 'static,
    {
        let handler: ToolFn = Arc::new(move |args| handler(args).boxed());
        self.insert(tool, handler);
        self
    }

    /// Add or replace a tool at runtime. Does not notify.
    pub fn add_tool<F>(&self, tool: RemoteTool, handler: F)
    where
        F: Fn(Map<String, Value>) -> McpResult<Value> + Send + Sync + 'static,
    {
        let handler: ToolFn = Arc::new(move |args| {
            let result = handler(args);
            async move { result }.boxed()
        });
        self.insert(tool, handler);
    }

    fn insert(&self, tool: RemoteTool, handler: ToolFn) {
        let mut tools = self.tools.write();
        match tools.iter_mut().find(|(t, _)| t.name == tool.name) {
            Some(slot) => *slot = (tool, handler),
            None => tools.push((tool, handler)),
        }
    }

    pub fn remove_tool(&self, name: &str) {
        self.tools.write().retain(|(t, _)| t.name != name);
    }

    /// Make `ping` and `list_tools` fail, as an unreachable server would
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    /// Push a tool-list-changed notification to the attached observer
    pub fn notify_tool_list_changed(&self) {
        if let Some(observer) = self.observer.read().as_ref() {
            observer.on_tool_list_changed();
        }
    }

    pub fn notify_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        if let Some(observer) = self.observer.read().as_ref() {
            observer.on_progress(progress, total, message);
        }
    }

    pub fn notify_log(&self, level: LogLevel, data: Value) {
        if let Some(observer) = self.observer.read().as_ref() {
            observer.on_log(level, Some(&self.name), &data);
        }
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::Acquire)
    }

    fn check_reachable(&self) -> McpResult<()> {
        if self.reachable.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(McpError::ServerUnreachable(self.name.clone()))
        }
    }
}

#[async_trait]
impl ToolServer for MemoryToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> McpResult<()> {
        self.check_reachable()
    }

    async fn list_tools(&self) -> McpResult<Vec<RemoteTool>> {
        self.check_reachable()?;
        Ok(self.tools.read().iter().map(|(t, _)| t.clone()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> McpResult<Value> {
        self.calls.lock().push((name.to_string(), arguments.clone()));
        let handler = self
            .tools
            .read()
            .iter()
            .find(|(t, _)| t.name == name)
            .map(|(_, h)| Arc::clone(h))
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        handler(arguments).await
    }

    fn attach(&self, observer: Arc<dyn ServerObserver>) {
        *self.observer.write() = Some(observer);
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_server() -> MemoryToolServer {
        MemoryToolServer::new("echo").with_tool(
            RemoteTool::new("echo").with_description("Echo arguments"),
            |args| Ok(Value::Object(args)),
        )
    }

    #[tokio::test]
    async fn test_list_and_call() {
        let server = echo_server();
        let tools = server.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].description.as_deref(), Some("Echo arguments"));

        let mut args = Map::new();
        args.insert("x".into(), json!(1));
        let result = server.call_tool("echo", args).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
        assert_eq!(server.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = echo_server().call_tool("nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_async_tool() {
        let server = MemoryToolServer::new("a").with_async_tool(RemoteTool::new("later"), |_| async {
            tokio::task::yield_now().await;
            Ok(json!("done"))
        });
        assert_eq!(server.call_tool("later", Map::new()).await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let server = echo_server();
        server.set_reachable(false);
        assert!(server.ping().await.is_err());
        assert!(server.list_tools().await.is_err());
    }

    #[tokio::test]
    async fn test_replace_tool_keeps_position() {
        let server = echo_server().with_tool(RemoteTool::new("second"), |_| Ok(json!(2)));
        server.add_tool(RemoteTool::new("echo").with_description("v2"), |_| Ok(json!(1)));
        let tools = server.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "echo");
        assert_eq!(tools[0].description.as_deref(), Some("v2"));
        assert_eq!(tools.len(), 2);
    }
}
