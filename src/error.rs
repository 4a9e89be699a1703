//! Error handling for the cronkit helpers.

/// A specialized `Result` type for cronkit operations.
pub type Result<T> = std::result::Result<T, KitError>;

/// The main error type for cronkit operations.
///
/// Only the collaborators surface errors (missing files, bad credentials,
/// transport failures). The metrics relay absorbs all of its failures.
#[derive(Debug, thiserror::Error)]
pub enum KitError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON document could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input could not be parsed
    #[error("Failed to parse: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Notification endpoint rejected the message
    #[error("Notification error: {0}")]
    Notify(String),

    /// Logging could not be installed
    #[error("Logging error: {0}")]
    Logging(String),
}

impl KitError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new notification error
    pub fn notify_error(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a new logging error
    pub fn logging_error(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }
}
