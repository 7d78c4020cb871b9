//! Data Transfer Objects (DTOs) for the HTTP API.
//!
//! - `http`: request/response bodies
//! - `conversion`: hub snapshots → response bodies
//!
//! WebSocket envelopes live in `yakata_shared::protocol`.

pub mod conversion;
pub mod http;
