//! Voice room membership for the full-mesh call topology.
//!
//! The coordinator only tracks who is in which voice room and at which
//! media endpoint. Media never touches the server; the joiner receives
//! the list of peers it must call and existing participants are told to
//! expect that call.

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::value_objects::ConnectionId;

/// A participant of a voice room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceParticipant {
    pub user_id: i64,
    pub username: String,
    /// Media endpoint address registered with the signaling broker
    pub endpoint_address: String,
    #[serde(skip)]
    pub connection_id: ConnectionId,
}

/// Outcome of a voice join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceJoin {
    /// Participants already present, excluding the joiner
    pub existing: Vec<VoiceParticipant>,
    /// Whether the user already had an entry that was updated in place
    pub rejoined: bool,
    /// Connection that owned the entry before a takeover
    pub previous_connection: Option<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct VoiceCoordinator {
    rooms: HashMap<i64, Vec<VoiceParticipant>>,
}

impl VoiceCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant, updating an existing entry for the same user.
    pub fn join(&mut self, channel_id: i64, participant: VoiceParticipant) -> VoiceJoin {
        let room = self.rooms.entry(channel_id).or_default();
        let existing: Vec<VoiceParticipant> = room
            .iter()
            .filter(|p| p.user_id != participant.user_id)
            .cloned()
            .collect();

        match room.iter_mut().find(|p| p.user_id == participant.user_id) {
            Some(entry) => {
                let previous = entry.connection_id;
                *entry = participant;
                VoiceJoin {
                    existing,
                    rejoined: true,
                    previous_connection: (previous != entry.connection_id).then_some(previous),
                }
            }
            None => {
                room.push(participant);
                VoiceJoin {
                    existing,
                    rejoined: false,
                    previous_connection: None,
                }
            }
        }
    }

    /// Remove one user from one room. Returns the removed entry.
    pub fn leave(&mut self, channel_id: i64, user_id: i64) -> Option<VoiceParticipant> {
        let room = self.rooms.get_mut(&channel_id)?;
        let index = room.iter().position(|p| p.user_id == user_id)?;
        let removed = room.remove(index);
        if room.is_empty() {
            self.rooms.remove(&channel_id);
        }
        Some(removed)
    }

    /// Remove a user from every voice room. Returns the rooms left.
    pub fn leave_all(&mut self, user_id: i64) -> Vec<(i64, VoiceParticipant)> {
        self.remove_where(|p| p.user_id == user_id)
    }

    /// Remove only the entries owned by `conn`.
    pub fn leave_connection(&mut self, conn: ConnectionId) -> Vec<(i64, VoiceParticipant)> {
        self.remove_where(|p| p.connection_id == conn)
    }

    pub fn participants(&self, channel_id: i64) -> &[VoiceParticipant] {
        self.rooms
            .get(&channel_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total participants across all rooms.
    pub fn participant_count(&self) -> usize {
        self.rooms.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }

    fn remove_where(
        &mut self,
        predicate: impl Fn(&VoiceParticipant) -> bool,
    ) -> Vec<(i64, VoiceParticipant)> {
        let mut removed = Vec::new();
        self.rooms.retain(|channel_id, room| {
            room.retain(|p| {
                if predicate(p) {
                    removed.push((*channel_id, p.clone()));
                    false
                } else {
                    true
                }
            });
            !room.is_empty()
        });
        removed.sort_by_key(|(channel_id, _)| *channel_id);
        removed
    }
}
