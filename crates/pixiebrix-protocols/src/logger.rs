//! Structured logging sink consumed by the runtime.

use serde::{Deserialize, Serialize};

use crate::error::SerializedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured context attached to a log entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_block(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }

    pub fn with_step(mut self, step_index: usize) -> Self {
        self.step_index = Some(step_index);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl ToString) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_error(mut self, error: SerializedError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Structured log sink. Callers never depend on its outcome.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext);

    fn debug(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Error, message, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLogger {
        entries: Mutex<Vec<(LogLevel, String)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, message: &str, _context: &LogContext) {
            self.entries.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn test_default_level_helpers() {
        let logger = RecordingLogger::default();
        let ctx = LogContext::new().with_run("run-1").with_step(2);
        logger.warn("retrying", &ctx);
        logger.error("failed", &ctx);

        let entries = logger.entries.lock().unwrap();
        assert_eq!(entries[0], (LogLevel::Warn, "retrying".to_string()));
        assert_eq!(entries[1], (LogLevel::Error, "failed".to_string()));
    }

    #[test]
    fn test_context_serialization_skips_empty() {
        let ctx = LogContext::new().with_block("@pixiebrix/get");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json, serde_json::json!({"blockId": "@pixiebrix/get"}));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Trace < LogLevel::Debug);
    }
}
