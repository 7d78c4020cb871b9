//! Error types for the Yakata terminal client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials or token were rejected by the server
    #[error("Authentication failed")]
    Unauthorized,

    /// Login endpoint answered with something other than a token
    #[error("Login failed with HTTP status {0}")]
    LoginStatus(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
