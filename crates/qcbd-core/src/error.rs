//! Centralized error types for QCBD.

use thiserror::Error;

/// Main error type for QCBD operations.
#[derive(Error, Debug)]
pub enum QcbdError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Invalid entity id: {0}")]
    InvalidId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for QCBD operations.
pub type QcbdResult<T> = Result<T, QcbdError>;

impl QcbdError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
