//! Use cases that run outside the hub.
//!
//! Only login lives here; everything after the upgrade is handled by the
//! actors in `crate::hub`.

pub mod error;
pub mod login;

pub use error::LoginError;
pub use login::LoginUseCase;
