//! Value objects.
//!
//! Identifiers are UUID newtypes; names are validated strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| ValueObjectError::InvalidId {
                        field: $field,
                        value: value.to_string(),
                    })
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Persistent identity of a user
    UserId,
    "user id"
);
uuid_id!(
    /// Identity of one live connection; a user may hold several
    SessionId,
    "session id"
);
uuid_id!(HouseId, "house id");
uuid_id!(RoomId, "room id");

fn validate_name(
    field: &'static str,
    value: String,
    max: usize,
    allow_spaces: bool,
) -> Result<String, ValueObjectError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ValueObjectError::Empty { field });
    }
    let actual = value.chars().count();
    if actual > max {
        return Err(ValueObjectError::TooLong { field, max, actual });
    }
    let invalid = value
        .chars()
        .any(|c| c.is_control() || (!allow_spaces && c.is_whitespace()));
    if invalid {
        return Err(ValueObjectError::InvalidCharacter { field });
    }
    Ok(value)
}

/// Login name of a user, also used as the display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub const MAX_LEN: usize = 32;

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_name("username", value, Self::MAX_LEN, false).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a house. Unique within one server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HouseName(String);

impl HouseName {
    pub const MAX_LEN: usize = 100;

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_name("house name", value, Self::MAX_LEN, true).map(Self)
    }

    /// Name of the private house shared by two users.
    ///
    /// The pair is sorted so both users derive the same name.
    pub fn private_pair(a: &UserId, b: &UserId) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}:{}", low, high))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a room inside a house
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    pub const MAX_LEN: usize = 100;

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_name("room name", value, Self::MAX_LEN, true).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_conversions {
    ($($name:ident),*) => {
        $(
            impl TryFrom<String> for $name {
                type Error = ValueObjectError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::new(value)
                }
            }

            impl From<$name> for String {
                fn from(value: $name) -> Self {
                    value.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_conversions!(Username, HouseName, RoomName);
