//! Infrastructure layer.
//!
//! Concrete implementations of the collaborators the domain layer defines.

pub mod auth;
pub mod dto;
pub mod pubsub;
pub mod repository;
