//! # Domain Services
//!
//! The in-memory registries owned by the gateway dispatcher. None of
//! them lock: the dispatcher is their only owner and processes one event
//! at a time.
//!
//! - **RoomDirectory**: which connections occupy each fan-out room
//! - **TypingTracker**: per-channel typing entries with expiry generations
//! - **PresenceMap**: live user status and the presence fan-out rule
//! - **VoiceCoordinator**: voice room participants for the call mesh

mod presence;
mod room_directory;
mod typing_tracker;
mod voice_coordinator;

pub use presence::{presence_audience, visible_status, PresenceMap};
pub use room_directory::{Occupant, RoomDirectory};
pub use typing_tracker::TypingTracker;
pub use voice_coordinator::{VoiceCoordinator, VoiceJoin, VoiceParticipant};
