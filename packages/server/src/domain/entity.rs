//! Domain entities.
//!
//! Each entity is a single data-owning struct. Conversion to wire references
//! happens in `infrastructure::dto::conversion`.

use super::value_object::{HouseId, HouseName, UserId, Username};

/// A known user identity (what the hub needs to address and display a user)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A registered account with login credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub username: Username,
    pub name: String,
    /// PHC string produced by the password hasher
    pub password_hash: String,
}

impl Account {
    /// Create a new account whose display name equals its username
    pub fn register(username: Username, password_hash: String) -> Self {
        Self {
            id: UserId::generate(),
            name: username.as_str().to_string(),
            username,
            password_hash,
        }
    }

    pub fn user(&self) -> User {
        User::new(self.id, self.name.clone())
    }
}

/// Persisted form of a house
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseRecord {
    pub id: HouseId,
    pub name: HouseName,
    pub private: bool,
}

impl HouseRecord {
    /// A brand-new house record with a fresh id
    pub fn create(name: HouseName, private: bool) -> Self {
        Self {
            id: HouseId::generate(),
            name,
            private,
        }
    }
}
