//! Error types for the chat client.

use thiserror::Error;

/// Errors that can occur while talking to the chat server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// An action needs a selected conversation.
    #[error("No conversation selected")]
    NoConversation,

    /// The server's answer was for a conversation no longer selected.
    #[error("Conversation changed while the request was in flight")]
    Stale,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
