//! Code shared between the Yakata server and client.
//!
//! - `logger`: tracing subscriber setup
//! - `time`: clock abstraction and timestamp formatting
//! - `protocol`: JSON envelope exchanged over the WebSocket

pub mod logger;
pub mod protocol;
pub mod time;
