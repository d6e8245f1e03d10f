//! Error types for the fuzzy match operator

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::row::{Charset, Row};

/// Which input stream a problem relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Main,
    Lookup,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Main => f.write_str("main"),
            Side::Lookup => f.write_str("lookup"),
        }
    }
}

/// Setup-time errors. These abort the operator before any row is read.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("minimum distance {min} exceeds maximum distance {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("distance bounds must be finite (min {min}, max {max})")]
    NonFiniteBounds { min: f64, max: f64 },

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("no {0} key field configured")]
    EmptyKeyField(Side),

    #[error("{side} stream has no field named '{field}'")]
    MissingField { side: Side, field: String },

    #[error("output field '{0}' is defined more than once")]
    DuplicateOutputField(String),

    #[error("{0} channel schema differs from the schema the operator was set up with")]
    SchemaMismatch(Side),
}

/// Row-level failure to turn a key cell into a string
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("field '{field}' is not valid {charset}: {reason}")]
    InvalidEncoding {
        field: String,
        charset: Charset,
        reason: String,
    },

    #[error("field '{field}' is declared opaque-binary but holds a {found} cell")]
    NotEncoded { field: String, found: &'static str },

    #[error("field '{field}' holds binary data and cannot be compared as text")]
    NotText { field: String },
}

impl DecodeError {
    pub fn field(&self) -> &str {
        match self {
            DecodeError::InvalidEncoding { field, .. }
            | DecodeError::NotEncoded { field, .. }
            | DecodeError::NotText { field } => field,
        }
    }
}

/// Errors returned by the operator driver
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("output channel closed by downstream consumer")]
    OutputClosed,

    #[error("lookup index has not been built")]
    IndexNotBuilt,
}

/// Result type for operator operations
pub type Result<T> = std::result::Result<T, OperatorError>;

/// A row that could not be processed, forwarded to the error channel
#[derive(Debug, Clone)]
pub struct RowError {
    pub side: Side,
    pub row: Row,
    pub field: String,
    pub message: String,
}

impl RowError {
    pub(crate) fn decode(side: Side, row: Row, err: &DecodeError) -> Self {
        Self {
            side,
            row,
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Sending half of the row-level error channel
pub type ErrorSender = mpsc::UnboundedSender<RowError>;
