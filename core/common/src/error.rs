//! Common error types for driverator.

use thiserror::Error;

/// Top-level error type for driverator operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation called before its inputs exist (no file id, no move target,
    /// handle not initialized). Raised before any remote call is made.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Credentials missing, invalid, or rejected by the provider.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Remote object not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote access denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Provider quota or rate limit hit.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Transport failure or unexpected provider response.
    #[error("Network error: {0}")]
    Network(String),

    /// No permission entry matches the requested principal.
    #[error("No permission found for {0}")]
    PermissionNotFound(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Metadata cache failure.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl Error {
    /// The error every file-scoped operation returns when no file id is set.
    pub fn missing_file_id() -> Self {
        Error::Precondition("No file_id set. Call initialize() or upload() first.".to_string())
    }

    /// Whether this error came back from the remote provider.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Authentication(_)
                | Error::NotFound(_)
                | Error::PermissionDenied(_)
                | Error::RateLimited(_)
                | Error::Network(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
