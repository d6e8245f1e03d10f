//! Error types for the fuzzyjoin harness.

use thiserror::Error;

/// Error type for reading, joining and writing row files.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] fuzzyjoin_core::ConfigError),

    /// Operator error
    #[error("operator error: {0}")]
    Operator(#[from] fuzzyjoin_core::OperatorError),

    /// Malformed row file
    #[error("{path}:{line}: {message}")]
    Format {
        path: String,
        line: usize,
        message: String,
    },

    /// A pipeline task panicked or was aborted
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn format(path: &str, line: usize, message: impl Into<String>) -> Self {
        Error::Format {
            path: path.to_string(),
            line,
            message: message.into(),
        }
    }
}

/// Result type alias using the harness Error.
pub type Result<T> = std::result::Result<T, Error>;
