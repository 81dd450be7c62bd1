//! Streamable HTTP tool server for transport tests

use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::{json, Map, Value};

/// Serves `echo`, `fail` and `announce`
///
/// `announce` pushes `tools/list_changed` before answering.
#[derive(Clone, Default)]
pub(crate) struct EchoServer;

fn schema(value: Value) -> Arc<Map<String, Value>> {
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(Map::new()),
    }
}

impl ServerHandler for EchoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(vec![
            Tool::new(
                "echo",
                "Echo the query",
                schema(json!({"type": "object", "properties": {"q": {"type": "string"}}})),
            ),
            Tool::new("fail", "Always fails", schema(json!({}))),
            Tool::new("announce", "Announce a tool list change", schema(json!({}))),
        ]))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        match request.name.as_ref() {
            "echo" => {
                let q = request
                    .arguments
                    .as_ref()
                    .and_then(|args| args.get("q"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(CallToolResult::success(vec![Content::text(format!("echo {}", q))]))
            }
            "fail" => Ok(CallToolResult::error(vec![Content::text("boom")])),
            "announce" => {
                let _ = context.peer.notify_tool_list_changed().await;
                // Keep the stream open long enough for the client to see it
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(CallToolResult::success(vec![Content::text("announced")]))
            }
            other => Err(ErrorData::invalid_params(format!("unknown tool {}", other), None)),
        }
    }
}

/// Bind `EchoServer` on a free local port and return its MCP URL
pub(crate) async fn spawn_echo_server() -> String {
    let service = StreamableHttpService::new(
        || Ok(EchoServer),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}/mcp", addr)
}
