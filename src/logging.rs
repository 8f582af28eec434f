use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::{Result, SalesWebError};

/// Initializes the logging system with console output and, when enabled, a
/// daily-rolling JSON file in the configured directory.
///
/// `RUST_LOG` takes precedence over the configured filter. The returned guard
/// must be kept alive for the file writer to flush.
pub fn init_logging(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .map_err(|e| SalesWebError::Config(format!("Invalid log filter '{}': {}", settings.filter, e)))?;

    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, guard) = if settings.json_file {
        fs::create_dir_all(&settings.directory)?;
        let file_appender = tracing_appender::rolling::daily(&settings.directory, "sales_web.log");
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
        (
            Some(fmt::layer().json().with_writer(non_blocking_writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| SalesWebError::Config(format!("Logging already initialized: {e}")))?;

    Ok(guard)
}
