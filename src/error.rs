//! Centralized error types for the log buffer.
//!
//! Sink failures never show up here: a sink that fails to accept a write is
//! evicted, and a sink that fails to close is ignored. Only buffer-lifecycle
//! and configuration errors reach callers.

/// Main error type for the log buffer crate.
#[derive(thiserror::Error, Debug)]
pub enum LogBufferError {
    #[error("Log buffer is already closed")]
    AlreadyClosed,

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for LogBufferError {
    fn from(error: figment::Error) -> Self {
        LogBufferError::Config(Box::new(error))
    }
}

/// Result type for log buffer operations.
pub type LogBufferResult<T> = Result<T, LogBufferError>;
