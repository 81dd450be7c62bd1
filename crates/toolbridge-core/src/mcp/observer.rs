//! Server-pushed notifications and the dirty flags they drive
//!
//! Each connection gets one `ConnectionObserver`. Transports feed it through
//! the `ServerObserver` capability; the registry reads and clears the flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::logging::{LogLevel, Logger, SharedLogger};

/// Capability a transport uses to report server notifications
pub trait ServerObserver: Send + Sync {
    fn on_tool_list_changed(&self);
    fn on_resource_list_changed(&self);
    fn on_prompt_list_changed(&self);
    /// `total` is `None` for indeterminate progress
    fn on_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>);
    fn on_log(&self, level: LogLevel, source: Option<&str>, data: &Value);
}

/// What the observer forwards to the logger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardingOptions {
    pub logging: bool,
    pub progress: bool,
}

/// Per-connection notification state
pub struct ConnectionObserver {
    label: String,
    tools_changed: AtomicBool,
    resources_changed: AtomicBool,
    prompts_changed: AtomicBool,
    forwarding: ForwardingOptions,
    logger: SharedLogger,
}

impl ConnectionObserver {
    pub fn new(label: impl Into<String>, forwarding: ForwardingOptions, logger: SharedLogger) -> Self {
        Self {
            label: label.into(),
            tools_changed: AtomicBool::new(false),
            resources_changed: AtomicBool::new(false),
            prompts_changed: AtomicBool::new(false),
            forwarding,
            logger,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tools_changed(&self) -> bool {
        self.tools_changed.load(Ordering::Acquire)
    }

    /// Tracked only; nothing consumes resources yet
    pub fn resources_changed(&self) -> bool {
        self.resources_changed.load(Ordering::Acquire)
    }

    pub fn prompts_changed(&self) -> bool {
        self.prompts_changed.load(Ordering::Acquire)
    }

    /// Reset all three flags
    pub fn clear(&self) {
        self.tools_changed.store(false, Ordering::Release);
        self.resources_changed.store(false, Ordering::Release);
        self.prompts_changed.store(false, Ordering::Release);
    }
}

impl ServerObserver for ConnectionObserver {
    fn on_tool_list_changed(&self) {
        self.tools_changed.store(true, Ordering::Release);
        self.logger
            .debug(&format!("[{}] Tool list changed", self.label));
    }

    fn on_resource_list_changed(&self) {
        self.resources_changed.store(true, Ordering::Release);
        self.logger
            .debug(&format!("[{}] Resource list changed", self.label));
    }

    fn on_prompt_list_changed(&self) {
        self.prompts_changed.store(true, Ordering::Release);
        self.logger
            .info(&format!("[{}] Prompt list changed", self.label));
    }

    fn on_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        if !self.forwarding.progress {
            return;
        }
        let amount = match total {
            Some(total) if total > 0.0 => format!("{:.1}%", progress / total * 100.0),
            _ => format!("step {}", progress),
        };
        let line = match message {
            Some(message) => format!("[{}] Progress: {} - {}", self.label, amount, message),
            None => format!("[{}] Progress: {}", self.label, amount),
        };
        self.logger.info(&line);
    }

    fn on_log(&self, level: LogLevel, source: Option<&str>, data: &Value) {
        if !self.forwarding.logging {
            return;
        }
        let text = match data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let line = match source {
            Some(source) => format!("[{}:{}] {}", self.label, source, text),
            None => format!("[{}] {}", self.label, text),
        };
        self.logger.log(level, &line);
    }
}

/// Every observer built by the transport factory
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Arc<RwLock<Vec<Arc<ConnectionObserver>>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<ConnectionObserver>) {
        self.observers.write().push(observer);
    }

    /// True when any server announced a tool list change
    pub fn any_tools_changed(&self) -> bool {
        self.observers.read().iter().any(|o| o.tools_changed())
    }

    pub fn clear_flags(&self) {
        for observer in self.observers.read().iter() {
            observer.clear();
        }
    }

    /// Forget every observer
    pub fn reset(&self) {
        self.observers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn debug(&self, msg: &str) {
            self.lines.lock().push(format!("DEBUG {}", msg));
        }
        fn info(&self, msg: &str) {
            self.lines.lock().push(format!("INFO {}", msg));
        }
        fn warn(&self, msg: &str) {
            self.lines.lock().push(format!("WARN {}", msg));
        }
        fn error(&self, msg: &str) {
            self.lines.lock().push(format!("ERROR {}", msg));
        }
    }

    fn observer(forwarding: ForwardingOptions) -> (Arc<ConnectionObserver>, Arc<RecordingLogger>) {
        let logger = Arc::new(RecordingLogger::default());
        let observer = Arc::new(ConnectionObserver::new("srv", forwarding, logger.clone()));
        (observer, logger)
    }

    #[test]
    fn test_flags_set_and_clear() {
        let (observer, _) = observer(ForwardingOptions::default());
        let set = ObserverSet::new();
        set.register(observer.clone());
        assert!(!set.any_tools_changed());

        observer.on_resource_list_changed();
        observer.on_prompt_list_changed();
        assert!(!set.any_tools_changed());
        assert!(observer.resources_changed());

        observer.on_tool_list_changed();
        assert!(set.any_tools_changed());

        set.clear_flags();
        assert!(!set.any_tools_changed());
        assert!(!observer.resources_changed());
        assert!(!observer.prompts_changed());
    }

    #[test]
    fn test_forwarding_disabled_is_silent() {
        let (observer, logger) = observer(ForwardingOptions::default());
        observer.on_progress(1.0, Some(2.0), None);
        observer.on_log(LogLevel::Error, None, &json!("boom"));
        assert!(logger.lines.lock().is_empty());
    }

    #[test]
    fn test_forwarding_enabled() {
        let (observer, logger) = observer(ForwardingOptions {
            logging: true,
            progress: true,
        });
        observer.on_progress(1.0, Some(4.0), Some("indexing"));
        observer.on_progress(3.0, None, None);
        observer.on_log(LogLevel::Warn, Some("db"), &json!("slow query"));
        observer.on_log(LogLevel::Info, None, &json!({"rows": 3}));

        let lines = logger.lines.lock();
        assert_eq!(lines[0], "INFO [srv] Progress: 25.0% - indexing");
        assert_eq!(lines[1], "INFO [srv] Progress: step 3");
        assert_eq!(lines[2], "WARN [srv:db] slow query");
        assert_eq!(lines[3], "INFO [srv] {\"rows\":3}");
    }

    #[test]
    fn test_reset_forgets_observers() {
        let (observer, _) = observer(ForwardingOptions::default());
        let set = ObserverSet::new();
        set.register(observer.clone());
        observer.on_tool_list_changed();
        set.reset();
        assert!(set.is_empty());
        assert!(!set.any_tools_changed());
    }
}
