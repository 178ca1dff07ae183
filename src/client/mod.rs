//! Client-side voice call state.
//!
//! Mesh link bookkeeping and outbound video track replacement for a
//! participant of a gateway voice room. Media capture and transport stay
//! behind [`MediaDevices`] and the returned [`CallAction`]s.

pub mod call;
pub mod media;

pub use call::{CallAction, CallError, LinkDirection, MeshCall, Peer, PeerLink, RemoteParticipant};
pub use media::{
    AudioTrack, MediaDevices, MediaError, TrackId, VideoSource, VideoTrack, PLACEHOLDER_FPS,
    PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH,
};
