//! Error types for notesync-core

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias using notesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notesync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Row store rejected the request
    #[error("{message}")]
    Remote {
        /// PostgREST error code, when the service reported one
        code: Option<String>,
        /// Human-readable message
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Object storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Auth service error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Operation requires a signed-in user
    #[error("User session not found. Please sign in again.")]
    NotAuthenticated,

    /// Missing or invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
