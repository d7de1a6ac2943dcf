//! Error types for the catalog platform client.

use thiserror::Error;

/// Errors surfaced by a [`crate::CatalogPlatform`] implementation.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The remote platform rejected the call with a structured API error.
    #[error("platform api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The call never reached the platform (connection, TLS, timeout).
    #[error("platform transport error: {0}")]
    Transport(String),

    /// An id-addressed lookup found nothing.
    #[error("not found: {id}")]
    NotFound { id: String },

    /// A payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        PlatformError::Transport(err.to_string())
    }
}

/// Result type for platform operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
