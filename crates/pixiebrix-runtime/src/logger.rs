//! [`Logger`] backed by `tracing`.

use pixiebrix_protocols::{LogContext, LogLevel, Logger};
use tracing::{debug, error, info, trace, warn};

/// Forwards run-level log entries to `tracing` under the `pixiebrix::run` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        let run_id = context.run_id.as_deref().unwrap_or_default();
        let block_id = context.block_id.as_deref().unwrap_or_default();
        let endpoint = context.endpoint.as_deref().unwrap_or_default();
        let step = context.step_index;
        let error = context.error.as_ref().map(|e| format!("{}: {}", e.name, e.message));

        macro_rules! emit {
            ($mac:ident) => {
                $mac!(
                    target: "pixiebrix::run",
                    run_id,
                    block_id,
                    endpoint,
                    step = ?step,
                    error = ?error,
                    "{}",
                    message
                )
            };
        }

        match level {
            LogLevel::Trace => emit!(trace),
            LogLevel::Debug => emit!(debug),
            LogLevel::Info => emit!(info),
            LogLevel::Warn => emit!(warn),
            LogLevel::Error => emit!(error),
        }
    }
}
