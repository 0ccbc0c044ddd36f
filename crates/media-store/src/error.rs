//! Error types for media-store.

use thiserror::Error;

/// Errors that can occur when storing or deleting objects.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-success status.
    #[error("gateway returned {status}: {body}")]
    Gateway { status: u16, body: String },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key would escape the storage root or is empty.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
