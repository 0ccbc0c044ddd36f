//! Error types for the message service.

use database::DatabaseError;
use media_store::StorageError;
use thiserror::Error;

/// Errors returned by [`MessageService`](crate::MessageService) operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The caller may not perform this action. Nothing was written.
    #[error("{0}")]
    Forbidden(String),

    /// A required record does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// The persistent store failed.
    #[error("database error: {0}")]
    Database(DatabaseError),

    /// The object storage gateway failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub(crate) fn forbidden(msg: impl Into<String>) -> Self {
        ServiceError::Forbidden(msg.into())
    }

    /// Whether this is an infrastructure failure rather than a caller mistake.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, ServiceError::Database(_) | ServiceError::Storage(_))
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DatabaseError::Invalid(e) => ServiceError::Validation(e.to_string()),
            other => ServiceError::Database(other),
        }
    }
}

impl From<database::ValidationError> for ServiceError {
    fn from(err: database::ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
