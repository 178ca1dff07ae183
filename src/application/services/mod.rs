//! Application Services
//!
//! - **AuthService**: gateway token verification
//! - **MessageService**: message validation, persistence and enrichment
//! - **DmService**: DM virtual room lookup and creation

pub mod auth_service;
pub mod dm_service;
pub mod message_service;

pub use auth_service::{AuthError, AuthService, AuthServiceImpl, Claims};
pub use dm_service::{DmConversation, DmError, DmService, DmServiceImpl};
pub use message_service::{
    validate_content, MessageError, MessageService, MessageServiceImpl, SendMessage, SentMessage,
};
