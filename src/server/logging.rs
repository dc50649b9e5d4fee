//! Logging initialization and configuration.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::config::{LogFormat, LoggingConfig};

/// Initialize the global tracing subscriber from configuration.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;

    let (writer, is_terminal) = make_writer(&config.output)?;
    let ansi = config.color && is_terminal;

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(config.target)
        .with_span_events(FmtSpan::NONE);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match (config.format, config.timestamps) {
        (LogFormat::Text, true) => registry.with(layer.with_ansi(ansi)).try_init(),
        (LogFormat::Text, false) => registry.with(layer.with_ansi(ansi).without_time()).try_init(),
        (LogFormat::Json, true) => registry.with(layer.json()).try_init(),
        (LogFormat::Json, false) => registry.with(layer.json().without_time()).try_init(),
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))
}

fn make_writer(output: &str) -> Result<(BoxMakeWriter, bool), LoggingError> {
    let writer = match output {
        "stdout" => (BoxMakeWriter::new(io::stdout), io::stdout().is_terminal()),
        "stderr" => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
        path => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| LoggingError::FileOpen(path.to_string(), e))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };
    Ok(writer)
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to open log file '{0}': {1}")]
    FileOpen(String, #[source] io::Error),

    /// A global subscriber was already installed.
    #[error("Failed to install subscriber: {0}")]
    Init(String),
}
