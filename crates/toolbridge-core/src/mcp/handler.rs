//! rmcp client handler that feeds server notifications to an observer

use std::sync::Arc;

use rmcp::model::{
    ClientCapabilities, ClientInfo, Implementation, LoggingLevel, LoggingMessageNotificationParam,
    ProgressNotificationParam,
};
use rmcp::service::NotificationContext;
use rmcp::{ClientHandler, RoleClient};

use super::observer::ServerObserver;
use crate::logging::LogLevel;

#[derive(Clone)]
pub struct ObservingHandler {
    observer: Arc<dyn ServerObserver>,
}

impl ObservingHandler {
    pub fn new(observer: Arc<dyn ServerObserver>) -> Self {
        Self { observer }
    }
}

/// Fold the eight MCP syslog levels onto ours
pub(crate) fn map_level(level: LoggingLevel) -> LogLevel {
    match level {
        LoggingLevel::Debug => LogLevel::Debug,
        LoggingLevel::Info | LoggingLevel::Notice => LogLevel::Info,
        LoggingLevel::Warning => LogLevel::Warn,
        LoggingLevel::Error
        | LoggingLevel::Critical
        | LoggingLevel::Alert
        | LoggingLevel::Emergency => LogLevel::Error,
    }
}

impl ClientHandler for ObservingHandler {
    async fn on_tool_list_changed(&self, _context: NotificationContext<RoleClient>) {
        self.observer.on_tool_list_changed();
    }

    async fn on_resource_list_changed(&self, _context: NotificationContext<RoleClient>) {
        self.observer.on_resource_list_changed();
    }

    async fn on_prompt_list_changed(&self, _context: NotificationContext<RoleClient>) {
        self.observer.on_prompt_list_changed();
    }

    async fn on_progress(
        &self,
        params: ProgressNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        self.observer.on_progress(
            params.progress as f64,
            params.total.map(|t| t as f64),
            params.message.as_deref(),
        );
    }

    async fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        self.observer
            .on_log(map_level(params.level), params.logger.as_deref(), &params.data);
    }

    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "toolbridge-core".to_string(),
                title: Some("Toolbridge".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        }
    }
}
