//! Yakata hub server library.
//!
//! Authenticated WebSocket sessions join houses and the rooms inside them and
//! exchange broadcast messages. The hub itself is a set of actors (server,
//! houses, rooms) in [`hub`]; the remaining layers wire it to HTTP, storage
//! and authentication.

// layers
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
