//! Persistence interfaces the hub depends on.
//!
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::{Account, HouseName, HouseRecord, RepositoryError, User, UserId, Username};

/// User Repository trait
///
/// `add_new_user` must enforce username uniqueness: when two registrations
/// race for the same username exactly one succeeds and the other gets
/// [`RepositoryError::DuplicateUsername`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Account with credentials, for login
    async fn find_by_username(&self, username: &Username)
    -> Result<Option<Account>, RepositoryError>;

    /// Identity by id; used when the server's cache misses
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// Register a new account with credentials
    async fn add_new_user(&self, account: Account) -> Result<(), RepositoryError>;

    /// Record an identity without credentials; no-op when already known
    async fn add_user(&self, user: User) -> Result<(), RepositoryError>;

    async fn get_all_users(&self) -> Result<Vec<User>, RepositoryError>;
}

/// House Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HouseRepository: Send + Sync {
    async fn find_by_name(&self, name: &HouseName) -> Result<Option<HouseRecord>, RepositoryError>;

    async fn add(&self, house: HouseRecord) -> Result<(), RepositoryError>;
}
