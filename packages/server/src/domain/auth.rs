//! Authentication collaborator interfaces.

use super::{AuthError, User};

/// Resolves the bearer token presented on upgrade into a user identity.
///
/// Called once per connection before a hub session is created.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, bearer: Option<&str>) -> Result<User, AuthError>;
}

/// Issues the bearer token handed out at login
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<String, AuthError>;
}
