//! Error types for the notifications domain.

use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
///
/// Only [`NotificationError::MalformedEvent`] ever leaves the coordinator.
/// Everything else is converted into a [`crate::models::DispatchOutcome`]
/// at the point where it happens.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The event is missing the identifiers needed to resolve a recipient.
    #[error("Malformed notification event: {0}")]
    MalformedEvent(String),

    /// Preference or token store could not be read.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The delivery provider rejected the message.
    #[error("Send failed ({code}): {message}")]
    SendFailed { code: String, message: String },

    /// The delivery provider could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The stored address cannot be used by the channel.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    /// Shorthand for a provider rejection.
    pub fn send_failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        NotificationError::SendFailed {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<redis::RedisError> for NotificationError {
    fn from(err: redis::RedisError) -> Self {
        NotificationError::StoreUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}
