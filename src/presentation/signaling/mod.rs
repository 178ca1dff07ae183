//! Media-signaling broker
//!
//! Runs on its own listener. Brokers peer-id discovery for the voice
//! mesh and relays SDP/ICE envelopes; no application payload passes here.

pub mod broker;
pub mod handler;

pub use broker::{PeerBroker, Relay, SignalFrame, SignalType};
pub use handler::signaling_router;
