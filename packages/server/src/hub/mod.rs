//! The hub: server, house and room actors and the client sessions between
//! them and the transport.
//!
//! Every actor owns its state and is driven by a bounded command queue.
//! Handles are cheap to clone and are the only way to reach an actor.

pub mod client;
pub mod error;
pub mod house;
mod members;
pub mod message;
pub mod outbound;
pub mod room;
pub mod server;
pub mod transport;

pub use client::{ClientHandle, Session};
pub use error::HubError;
pub use house::{HouseHandle, HouseSnapshot, RoomSnapshot};
pub use message::Message;
pub use outbound::{Delivery, OverflowPolicy};
pub use room::RoomHandle;
pub use server::{ServerHandle, ServerStats};
pub use transport::{Frame, FrameSink, FrameStream, PeerTransport, TransportError, channel_transport};
