//! Error types for the TaskDesk client core.

use thiserror::Error;

/// Generic message used when neither the backend nor the caller supplies one.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// A shared error type for the entire TaskDesk workspace.
///
/// The variants follow the failure taxonomy of the client: session-fatal
/// authentication failures, authorization failures after a retry, business
/// rejections reported by the backend, and transport/unknown failures.
/// The type is `Clone` so it can travel inside store events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskdeskError {
    /// The session cannot be continued (refresh failed, no valid tokens).
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// The backend kept answering 401 after a forced refresh.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend accepted the call but reported that nothing happened.
    #[error("{0}")]
    Rejected(String),

    /// Non-success HTTP status with the backend's `message` field, if any.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    Http {
        status: u16,
        message: Option<String>,
    },

    /// Connection, timeout or protocol failure below HTTP.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Durable key-value storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation was cancelled before it settled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl TaskdeskError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Rejected error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a SessionExpired error
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::SessionExpired(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error ended the session or the authorization retry.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::SessionExpired(_) | Self::Unauthorized(_))
    }

    /// Check if this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the HTTP status if the failure came from a backend response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// Produces the human-readable message shown to the user.
    ///
    /// Backend-provided messages and business rejections win; everything
    /// else collapses to `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            Self::Http {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::Rejected(message) => message.clone(),
            Self::SessionExpired(_) | Self::Unauthorized(_) => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TaskdeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TaskdeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TaskdeskError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TaskdeskError>`.
pub type Result<T> = std::result::Result<T, TaskdeskError>;
