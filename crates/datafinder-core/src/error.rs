//! Error types for datafinder-core

use thiserror::Error;

/// Result type alias for datafinder operations
pub type Result<T> = std::result::Result<T, DataFinderError>;

/// Main error type, aggregating the errors of every layer
#[derive(Error, Debug)]
pub enum DataFinderError {
    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Errors raised while converting values into the persistence format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value has no persistence representation. Nothing may be stored.
    #[error("Persistence support for values of type '{0}' is not available")]
    UnsupportedType(String),
}

/// A property value or identifier violates its definition.
///
/// Raised while materializing a property; the edit model recovers from it by
/// flagging the affected row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("property '{identifier}': {message}")]
pub struct PropertyError {
    pub identifier: String,
    pub message: String,
}

impl PropertyError {
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

/// Storage backend errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("The URI scheme '{0}' is unsupported")]
    UnsupportedScheme(String),

    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("The item URI '{item}' and the file system base URI '{base}' do not match")]
    BaseUriMismatch { item: String, base: String },

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors of the property edit model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
