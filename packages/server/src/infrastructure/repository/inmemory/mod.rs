//! In-memory repositories.
//!
//! Backed by `HashMap`s; nothing survives a restart.

mod house;
mod user;

pub use house::InMemoryHouseRepository;
pub use user::InMemoryUserRepository;
