//! Tool-server connections
//!
//! Uses the official rmcp SDK for remote servers (streamable HTTP and
//! stdio subprocesses) and the `ToolServer` trait for in-process ones.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolbridge_core::config::ServerConfig;
//! use toolbridge_core::mcp::{ForwardingOptions, ObserverSet, TransportFactory};
//!
//! let factory = TransportFactory::new(ObserverSet::new(), ForwardingOptions::default(), logger);
//! let conn = factory.build(&ServerConfig::http("http://localhost:8000/mcp/"))?;
//!
//! let tools = conn.probe().await?;
//! let output = conn.call_tool("search", args).await?;
//! println!("{}", output.render("search"));
//! ```

mod connection;
mod error;
mod handler;
mod memory;
mod observer;
mod output;
mod server;
#[cfg(test)]
pub(crate) mod testing;
mod transport;

pub use connection::Connection;
pub use error::{McpError, McpResult};
pub use handler::ObservingHandler;
pub use memory::MemoryToolServer;
pub use observer::{ConnectionObserver, ForwardingOptions, ObserverSet, ServerObserver};
pub use output::ToolOutput;
pub use server::{RemoteTool, ToolServer};
pub use transport::TransportFactory;
