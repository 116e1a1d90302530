//! Error types for cache backends

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Cache storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact could not be parsed or encoded as CSV
    #[error("CSV error: {0}")]
    Csv(String),

    /// Entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Moving a staged entry into place failed
    #[error("Failed to publish {}: {message}", path.display())]
    Publish { path: PathBuf, message: String },

    /// Entry metadata is unreadable
    #[error("Corrupted entry: {0}")]
    Corrupted(String),

    /// A namespace that would resolve outside the cache root
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),
}

impl StorageError {
    /// Create a CSV error
    pub fn csv<E: fmt::Display>(err: E) -> Self {
        Self::Csv(err.to_string())
    }

    /// Create a not found error
    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    /// Create a publish error
    pub fn publish<E: fmt::Display>(path: impl Into<PathBuf>, err: E) -> Self {
        Self::Publish {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a corruption error
    pub fn corrupted<E: fmt::Display>(msg: E) -> Self {
        Self::Corrupted(msg.to_string())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        Self::csv(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::corrupted(err)
    }
}
