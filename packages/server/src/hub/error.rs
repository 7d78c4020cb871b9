//! Hub errors.

use thiserror::Error;

use crate::domain::{RepositoryError, ValueObjectError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("server loop has stopped")]
    ServerStopped,

    #[error("house '{0}' loop has stopped")]
    HouseStopped(String),

    #[error("room '{0}' loop has stopped")]
    RoomStopped(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    InvalidName(#[from] ValueObjectError),
}
