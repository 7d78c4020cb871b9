//! Request handlers.

mod http;
mod websocket;

pub use http::{get_house_detail, get_houses, health_check, login};
pub use websocket::websocket_handler;
