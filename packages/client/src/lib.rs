//! Terminal client for the Yakata house/room chat hub.
//!
//! Logs in over HTTP, connects to the WebSocket with the issued bearer
//! token, and turns typed lines into protocol messages.

pub mod command;
mod domain;
pub mod error;
pub mod formatter;
pub mod login;
mod runner;
mod session;
pub mod state;
mod ui;

pub use runner::{ClientOptions, run_client};
