//! Error types for mongostate

use crate::IndexIdentity;
use thiserror::Error;

/// Core error type for mongostate operations
#[derive(Error, Debug)]
pub enum MongostateError {
    /// The declared configuration is self-contradictory or violates a documented constraint
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No index matches the identity triple
    #[error("Not found: index {0}")]
    NotFound(IndexIdentity),

    /// A database operation failed
    #[error("Database error: {operation} {identity}: {message}")]
    Database {
        operation: &'static str,
        identity: IndexIdentity,
        message: String,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl MongostateError {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error means the index does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the caller can fix this error by editing the declared configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias for mongostate operations
pub type Result<T> = std::result::Result<T, MongostateError>;
