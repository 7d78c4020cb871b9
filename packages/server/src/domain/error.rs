//! Domain errors.

use thiserror::Error;

/// Validation failures when constructing value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} must not contain whitespace or control characters")]
    InvalidCharacter { field: &'static str },

    #[error("'{value}' is not a valid {field}")]
    InvalidId { field: &'static str, value: String },
}

/// Failures reported by the persistence collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Unique constraint on usernames
    #[error("username '{0}' is already registered")]
    DuplicateUsername(String),

    /// Unique constraint on house names
    #[error("house '{0}' already exists")]
    DuplicateHouse(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures while authenticating a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token: {0}")]
    InvalidToken(String),

    #[error("failed to issue token: {0}")]
    Issue(String),
}
