//! # Domain Entities
//!
//! Durable business objects owned by the persistence collaborator.
//!
//! - **User**: identity and last persisted status
//! - **Server / Channel**: communities and their rooms
//! - **Message**: a chat message with optional link preview
//! - **DmRoom**: the hidden virtual server behind a 1:1 conversation
//!
//! Each entity has an associated repository trait. The traits are
//! implemented in the infrastructure layer.

mod channel;
mod dm;
mod message;
mod user;

pub use channel::{Channel, ChannelType, Server, ServerRepository};
pub use dm::{DmPair, DmRepository, DmRoom};
pub use message::{LinkPreview, LinkPreviewer, Message, MessageRepository};
#[cfg(test)]
pub use message::MockLinkPreviewer;
pub use user::{User, UserRepository, UserStatus};
