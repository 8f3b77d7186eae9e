//! Session errors

use thiserror::Error;

use trackview_core::{ApiError, EditError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Api error: {0}")]
    Api(#[from] ApiError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Track {0} is not an active recording")]
    NotLive(String),

    #[error("Live feed already attached to track {0}")]
    AlreadyAttached(String),

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
