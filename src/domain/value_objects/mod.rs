//! # Domain Value Objects
//!
//! - **ConnectionId**: identity of one live gateway connection
//! - **RoomKey**: address of a fan-out room

mod connection_id;
mod room_key;

pub use connection_id::ConnectionId;
pub use room_key::RoomKey;
