//! WebSocket and HTTP message types

pub mod messages;

pub use messages::*;
