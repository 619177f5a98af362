//! Error types for Pyrite
//!
//! This module defines all error types used throughout the dispatcher.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Failures are localized to their pipeline slot wherever possible: only a
//! backend client initialization failure fails a whole batch.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for dispatcher operations
#[derive(Error, Debug)]
pub enum PyriteError {
    /// Command name is not present in the registry
    #[error("{0}: unsupported command")]
    UnsupportedCommand(String),

    /// Exact-arity command received a different number of tokens
    #[error("{0}: wrong number of arguments")]
    WrongArity(String),

    /// Minimum-arity command received fewer tokens than required
    #[error("{0}: too few arguments")]
    TooFewArguments(String),

    /// Argument parser rejected the command tokens
    #[error("{0}")]
    Parse(String),

    /// Backend client or table-open bootstrap failed
    #[error("could not open table '{table}': {message}")]
    ClientInit {
        /// Name of the table the dispatcher tried to open
        table: String,
        /// Underlying status from the backend client
        message: String,
    },

    /// Session refused an operation before flush (local validation)
    #[error("operation rejected: {0}")]
    ApplyRejected(String),

    /// Session-level failure surfaced by an async flush
    #[error("flush failed: {0}")]
    Flush(String),

    /// A session deadline elapsed before the flush completed
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration parsing or validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal dispatcher error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for dispatcher operations
pub type Result<T> = std::result::Result<T, PyriteError>;

impl PyriteError {
    /// Convert error to the RESP error line the wire layer sends for it
    #[cold]
    pub fn to_resp_error(&self) -> String {
        format!("ERR {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_error_messages() {
        assert_eq!(
            PyriteError::UnsupportedCommand("foobar".to_string()).to_string(),
            "foobar: unsupported command"
        );
        assert_eq!(
            PyriteError::WrongArity("get".to_string()).to_string(),
            "get: wrong number of arguments"
        );
        assert_eq!(
            PyriteError::TooFewArguments("mget".to_string()).to_string(),
            "mget: too few arguments"
        );
    }

    #[test]
    fn test_error_to_resp() {
        assert_eq!(
            PyriteError::Flush("connection reset".to_string()).to_resp_error(),
            "ERR flush failed: connection reset"
        );
    }
}
