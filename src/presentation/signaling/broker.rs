//! Peer-id broker for the voice mesh.
//!
//! Maps peer ids to live signaling sockets and relays opaque
//! offer/answer/candidate envelopes between them. It never inspects the
//! payloads and knows nothing about users or rooms.

use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::infrastructure::metrics;

/// Longest accepted peer id
pub const MAX_PEER_ID_LENGTH: usize = 64;

/// Frame types on the signaling socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum SignalType {
    Open,
    IdTaken,
    Offer,
    Answer,
    Candidate,
    Leave,
    Expire,
    Heartbeat,
    Error,
}

/// One signaling frame: `{"type", "src"?, "dst"?, "payload"?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    #[serde(rename = "type")]
    pub kind: SignalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl SignalFrame {
    pub fn control(kind: SignalType) -> Self {
        Self {
            kind,
            src: None,
            dst: None,
            payload: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            payload: Some(serde_json::json!({ "msg": message.into() })),
            ..Self::control(SignalType::Error)
        }
    }

    /// Whether clients may send this frame type to a peer.
    fn is_relayable(&self) -> bool {
        matches!(
            self.kind,
            SignalType::Offer | SignalType::Answer | SignalType::Candidate | SignalType::Leave
        )
    }
}

/// Result of relaying one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Relay {
    Delivered,
    Ignored,
    /// Frame to send back to the originating peer
    Reply(SignalFrame),
}

pub type PeerSender = mpsc::UnboundedSender<SignalFrame>;

#[derive(Debug, Default)]
pub struct PeerBroker {
    peers: DashMap<String, PeerSender>,
}

impl PeerBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh random peer id.
    pub fn issue_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Claim `id` for a socket. Returns false when the id is taken.
    pub fn register(&self, id: &str, sender: PeerSender) -> bool {
        let claimed = match self.peers.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(sender);
                true
            }
        };
        metrics::set_signaling_peers(self.peers.len());
        claimed
    }

    /// Release `id` if it is still held by `sender`'s socket.
    pub fn release(&self, id: &str, sender: &PeerSender) {
        self.peers
            .remove_if(id, |_, registered| registered.same_channel(sender));
        metrics::set_signaling_peers(self.peers.len());
    }

    /// Forward a frame from `src` to its destination, stamping `src`.
    pub fn relay(&self, src: &str, mut frame: SignalFrame) -> Relay {
        if frame.kind == SignalType::Heartbeat {
            return Relay::Ignored;
        }
        if !frame.is_relayable() {
            tracing::debug!(peer_id = src, kind = ?frame.kind, "Ignoring client control frame");
            return Relay::Ignored;
        }
        let Some(dst) = frame.dst.clone() else {
            return Relay::Reply(SignalFrame::error("Missing dst"));
        };

        frame.src = Some(src.to_string());
        let delivered = self
            .peers
            .get(&dst)
            .is_some_and(|peer| peer.send(frame).is_ok());

        if delivered {
            Relay::Delivered
        } else {
            tracing::debug!(peer_id = src, dst = %dst, "Destination peer is gone");
            Relay::Reply(SignalFrame {
                src: Some(dst),
                ..SignalFrame::control(SignalType::Expire)
            })
        }
    }

    /// Connected peer ids, sorted.
    pub fn peer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.peers.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Peer ids are 1-64 characters of ASCII letters, digits, `-` and `_`.
pub fn is_valid_peer_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_PEER_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
