//! Logging setup errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("A global subscriber is already installed")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to create log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create rolling appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
}
