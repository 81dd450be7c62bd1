//! Core types shared by the registry, providers and client
//!
//! This module contains the transcript, tool and result types.

mod message;
mod tool;
mod result;
mod cancellation;

pub use message::{ChatMessage, MessageRole};
pub use tool::{FunctionCall, Tool, ToolCall};
pub use result::ExecutionResult;
pub use cancellation::CancellationToken;
