//! Error types for the reset Lambda.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a reset request.
#[derive(Error, Debug)]
pub enum Error {
    /// Request body is not JSON or has no `code` field
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Supplied code does not match today's expected code
    #[error("Authentication mismatch")]
    AuthenticationMismatch,

    /// Downstream private API call failed or was rejected
    #[error("Downstream failure: {0}")]
    Downstream(String),

    /// Request signing error
    #[error("Signing error: {0}")]
    Signing(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MalformedInput(_) => 400,
            Error::AuthenticationMismatch => 403,
            _ => 500,
        }
    }
}
