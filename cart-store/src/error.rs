//! Storage layer errors

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File the operation touched
        path: String,
        /// Underlying error
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error (reading the backing file)
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Store cannot serve requests right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create an I/O error for a path
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
