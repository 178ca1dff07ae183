//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

mod dispatcher;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod session;

pub use gateway::{Gateway, GatewayContext, GatewayHandle, GatewayStats};
pub use handler::ws_handler;
pub use messages::{ClientEvent, ServerEvent};
pub use session::{Heartbeat, Session, SessionRegistry, MAX_BACKLOG};
