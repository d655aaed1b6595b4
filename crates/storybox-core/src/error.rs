//! Error types for storybox-core

use thiserror::Error;

/// Result type alias using storybox-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in storybox-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The durable store could not be opened; offline features are disabled
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Transaction misuse (out-of-scope collection, write in read-only mode)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Transport-level failure while the client believes it is disconnected
    #[error("Network unavailable while offline: {0}")]
    Offline(String),

    /// Missing or rejected auth token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller input rejected before any network attempt
    #[error("Validation error: {0}")]
    Validation(String),

    /// Photo exceeds the upload limit
    #[error("Payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Remote service answered with a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Remote response did not match any known shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Platform has no push capability
    #[error("Push notifications are not supported on this platform")]
    PushUnsupported,

    /// User refused notification permission
    #[error("Notification permission denied")]
    PermissionDenied,

    /// Push server registration failed
    #[error("Remote push registration failed: {0}")]
    RemoteRegistrationFailed(String),
}

impl Error {
    /// Whether the error came from the transport rather than the remote service.
    ///
    /// Only these errors justify serving mirrored data or falling back to a draft.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Offline(_))
    }
}
