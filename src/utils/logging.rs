use std::fs::OpenOptions;
use std::sync::{Mutex, Once};

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{EngineError, Result};

static INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Only the first call has any effect. `RUST_LOG` wins over the configured
/// level when set. Output goes to stderr so it never mixes with replies on
/// stdout.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let mut result = Ok(());

    INIT.call_once(|| {
        result = setup_logging_internal(config);
    });

    result
}

fn setup_logging_internal(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kira_engine={}", config.level.as_str())));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match &config.file_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    EngineError::initialization(
                        format!("Failed to open log file {}", path.display()),
                        e,
                    )
                })?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => subscriber.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| EngineError::InitializationError {
        message: format!("Failed to set global subscriber: {}", e),
        source: None,
    })
}
