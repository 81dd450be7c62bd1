//! Agent client: the tool-orchestration loop
//!
//! One `execute` call runs
//! `Connecting -> AwaitingFirstCompletion -> (Direct | ExecutingTools ->
//! AwaitingSecondCompletion) -> Done`, or stops in `Failed` when a completion
//! request fails. Tool and server failures never fail the turn; they reach
//! the model as error strings.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::config::ClientConfig;
use crate::logging::{ConsoleLogger, SharedLogger};
use crate::mcp::ForwardingOptions;
use crate::providers::{
    ChatCompletionsProvider, CompletionRequest, CompletionResponse, Provider, ProviderError,
    ProviderResult,
};
use crate::tools::{ClientStats, ToolRegistry};
use crate::types::{ChatMessage, ExecutionResult, Tool};
use crate::{log_info, log_warn};

/// Output used when the model returns no text
pub const EMPTY_RESPONSE: &str = "Empty response";

/// The completion request an execution was waiting on when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingFirstCompletion,
    AwaitingSecondCompletion,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AwaitingFirstCompletion => "awaiting_first_completion",
            Phase::AwaitingSecondCompletion => "awaiting_second_completion",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a successful turn ended
enum Turn {
    Direct {
        output: String,
        raw: Value,
    },
    WithTools {
        output: String,
        raw: Value,
        tools_available: usize,
    },
}

struct Failure {
    phase: Phase,
    error: ProviderError,
}

/// Orchestrates a language model and the tool servers it may call
///
/// The tool registry is connected on first use and reused by every
/// `execute` call until `close`.
///
/// ```rust,ignore
/// use toolbridge_core::{AgentClient, ClientConfig};
///
/// let config = ClientConfig::new("deepseek-chat")
///     .with_system_prompt("You are an e-commerce assistant.")
///     .with_server("http://localhost:8000/mcp/");
/// let client = AgentClient::from_env(config)?;
///
/// let result = client.execute("Find cheap laptops").await;
/// println!("{}", result.output);
/// client.close().await;
/// ```
pub struct AgentClient {
    config: ClientConfig,
    provider: Arc<dyn Provider>,
    registry: ToolRegistry,
    logger: SharedLogger,
}

impl AgentClient {
    /// Create a client that logs to the console at the configured level
    pub fn new(config: ClientConfig, provider: Arc<dyn Provider>) -> Self {
        let logger: SharedLogger = Arc::new(ConsoleLogger::new().with_level(config.log_level));
        Self::with_logger(config, provider, logger)
    }

    pub fn with_logger(config: ClientConfig, provider: Arc<dyn Provider>, logger: SharedLogger) -> Self {
        let forwarding = ForwardingOptions {
            logging: config.enable_logging,
            progress: config.enable_progress,
        };
        let registry = ToolRegistry::new(config.servers.clone(), forwarding, logger.clone());
        Self {
            config,
            provider,
            registry,
            logger,
        }
    }

    /// Create a client backed by the DeepSeek endpoint configured in the environment
    pub fn from_env(config: ClientConfig) -> ProviderResult<Self> {
        let logger: SharedLogger = Arc::new(ConsoleLogger::new().with_level(config.log_level));
        let provider = ChatCompletionsProvider::from_env(logger.clone())?;
        Ok(Self::with_logger(config, Arc::new(provider), logger))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one instruction to a final answer. Never fails; see `ExecutionResult::success`.
    pub async fn execute(&self, instruction: &str) -> ExecutionResult {
        let execution_id = ExecutionResult::new_execution_id();
        let timestamp = Utc::now();
        let started = Instant::now();
        let mut tools_used = Vec::new();

        let outcome = self.run(instruction, &mut tools_used).await;

        let mut metadata = Map::new();
        metadata.insert("model".into(), json!(self.config.model));
        metadata.insert("duration".into(), json!(started.elapsed().as_secs_f64()));

        match outcome {
            Ok(Turn::Direct { output, raw }) => {
                metadata.insert("direct_response".into(), json!(true));
                ExecutionResult {
                    output,
                    success: true,
                    execution_id,
                    timestamp,
                    tools_used,
                    metadata,
                    raw_response: Some(raw),
                    error: None,
                }
            }
            Ok(Turn::WithTools {
                output,
                raw,
                tools_available,
            }) => {
                metadata.insert("tools_executed".into(), json!(tools_used.len()));
                metadata.insert("tools_available".into(), json!(tools_available));
                metadata.insert(
                    "servers_connected".into(),
                    json!(self.registry.connection_count()),
                );
                ExecutionResult {
                    output,
                    success: true,
                    execution_id,
                    timestamp,
                    tools_used,
                    metadata,
                    raw_response: Some(raw),
                    error: None,
                }
            }
            Err(Failure { phase, error }) => {
                self.logger.error(&format!(
                    "[AgentClient] Execution {} failed while {}: {}",
                    execution_id, phase, error
                ));
                metadata.insert("error_type".into(), json!(error.category()));
                metadata.insert("phase".into(), json!(phase.as_str()));
                ExecutionResult {
                    output: String::new(),
                    success: false,
                    execution_id,
                    timestamp,
                    tools_used,
                    metadata,
                    raw_response: None,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    async fn run(&self, instruction: &str, tools_used: &mut Vec<String>) -> Result<Turn, Failure> {
        if !self.config.is_direct() {
            if !self.registry.is_connected() {
                self.registry.connect_all().await;
            }
            if self.registry.has_connections() {
                self.registry.refresh().await;
            }
        }

        log_info!(self.logger, "[AgentClient] Executing: {}", instruction);

        let mut messages = vec![
            ChatMessage::system(self.config.system_prompt.clone()),
            ChatMessage::user(instruction),
        ];
        let tools = self.registry.tool_schemas();
        let tools_available = tools.len();

        let first = self
            .complete(messages.clone(), &tools)
            .await
            .map_err(|error| Failure {
                phase: Phase::AwaitingFirstCompletion,
                error,
            })?;

        if !first.message.has_tool_calls() {
            return Ok(Turn::Direct {
                output: output_text(&first.message),
                raw: first.raw,
            });
        }

        let calls = first.message.tool_calls.clone();
        log_info!(self.logger, "[AgentClient] Executing {} tools", calls.len());
        messages.push(ChatMessage::assistant_tool_calls(
            first.message.content.clone(),
            calls.clone(),
        ));

        for call in &calls {
            let arguments = match call.parse_arguments() {
                Ok(arguments) => arguments,
                Err(e) => {
                    log_warn!(
                        self.logger,
                        "[AgentClient] Malformed arguments for {}, using {{}}: {}",
                        call.name(),
                        e
                    );
                    Map::new()
                }
            };
            tools_used.push(call.name().to_string());
            let result = self.registry.call_tool(call.name(), arguments).await;
            messages.push(ChatMessage::tool_result(call.id.clone(), result));
        }

        self.logger.debug("[AgentClient] Sending tool results to the model");
        let second = self
            .complete(messages, &tools)
            .await
            .map_err(|error| Failure {
                phase: Phase::AwaitingSecondCompletion,
                error,
            })?;

        Ok(Turn::WithTools {
            output: output_text(&second.message),
            raw: second.raw,
            tools_available,
        })
    }

    async fn complete(&self, messages: Vec<ChatMessage>, tools: &[Tool]) -> ProviderResult<CompletionResponse> {
        let request = CompletionRequest::new(self.config.model.clone(), messages)
            .with_tools(tools.to_vec())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        self.provider.complete(request).await
    }

    /// Close every tool-server connection. The next `execute` reconnects.
    pub async fn close(&self) {
        self.registry.close().await;
    }

    /// Tool names currently offered to the model
    pub fn available_tools(&self) -> Vec<String> {
        self.registry.available_tools()
    }

    pub fn tool_schemas(&self) -> Vec<Tool> {
        self.registry.tool_schemas()
    }

    pub fn stats(&self) -> ClientStats {
        self.registry.stats()
    }
}

fn output_text(message: &ChatMessage) -> String {
    message.text().unwrap_or(EMPTY_RESPONSE).to_string()
}
