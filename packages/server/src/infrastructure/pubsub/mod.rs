//! Presence bridge implementations.
//!
//! - `disabled`: publishes nothing (the default)
//! - `local`: in-process bus backed by a tokio broadcast channel; lets several
//!   hub instances in one process share presence

pub mod disabled;
pub mod local;

pub use disabled::DisabledBridge;
pub use local::LocalBridge;
