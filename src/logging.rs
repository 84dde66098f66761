//! Tracing subscriber setup.

use anyhow::Context;
use pixiebrix_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Days of rolled log files kept on disk.
const MAX_LOG_FILES: usize = 14;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. When a log file is configured,
/// the returned guard must be held for as long as logs should be flushed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level '{}'", config.level))?;

    let (file_layer, guard) = match &config.file {
        Some(file) => {
            let directory = file.directory_path();
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("failed to create log directory {:?}", directory))?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(file.prefix.as_str())
                .max_log_files(MAX_LOG_FILES)
                .build(&directory)
                .context("failed to create log file appender")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = config.json.then(|| fmt::layer().json().with_target(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true).with_ansi(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}
