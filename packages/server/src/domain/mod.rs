//! Domain layer.
//!
//! Value objects, entities and the collaborator traits the hub depends on.
//! Concrete implementations live in the infrastructure layer.

pub mod auth;
pub mod entity;
pub mod error;
pub mod presence;
pub mod repository;
pub mod value_object;

pub use auth::{Authenticator, TokenIssuer};
pub use entity::{Account, HouseRecord, User};
pub use error::{AuthError, RepositoryError, ValueObjectError};
pub use presence::{BridgeError, InstanceId, PresenceBridge, PresenceEnvelope, PresenceEvent};
pub use repository::{HouseRepository, UserRepository};
pub use value_object::{HouseId, HouseName, RoomId, RoomName, SessionId, UserId, Username};
