//! Use case errors.

use thiserror::Error;

use crate::{
    domain::{AuthError, RepositoryError},
    infrastructure::auth::PasswordError,
};

/// Why a login was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] AuthError),

    /// The blocking hash task panicked or was cancelled
    #[error("password task failed: {0}")]
    Task(String),
}
