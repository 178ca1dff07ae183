//! Presentation Layer
//!
//! HTTP routes, the WebSocket gateway and the media-signaling broker.

pub mod http;
pub mod middleware;
pub mod signaling;
pub mod websocket;
