//! Room membership directory.
//!
//! Tracks which live connections currently occupy each fan-out room.
//! The directory knows nothing about whether a room exists durably; an
//! entry appears on first join and is discarded when its last occupant
//! leaves.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::value_objects::{ConnectionId, RoomKey};

/// Identity of a connection inside a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupant {
    pub user_id: i64,
    pub username: String,
}

/// In-memory room membership, owned by the gateway dispatcher.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomKey, BTreeMap<ConnectionId, Occupant>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or refresh) a connection in a room.
    ///
    /// Returns `true` when the connection was not already an occupant.
    pub fn join(&mut self, room: RoomKey, conn: ConnectionId, occupant: Occupant) -> bool {
        self.rooms
            .entry(room)
            .or_default()
            .insert(conn, occupant)
            .is_none()
    }

    /// Remove a connection from a room, discarding the room when it empties.
    pub fn leave(&mut self, room: RoomKey, conn: ConnectionId) -> Option<Occupant> {
        let occupants = self.rooms.get_mut(&room)?;
        let removed = occupants.remove(&conn);
        if occupants.is_empty() {
            self.rooms.remove(&room);
        }
        removed
    }

    pub fn contains(&self, room: RoomKey, conn: ConnectionId) -> bool {
        self.rooms
            .get(&room)
            .is_some_and(|occupants| occupants.contains_key(&conn))
    }

    /// Every connection currently in the room.
    pub fn connections(&self, room: RoomKey) -> Vec<ConnectionId> {
        self.rooms
            .get(&room)
            .map(|occupants| occupants.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Connections in the room with their occupant identity.
    pub fn occupants(&self, room: RoomKey) -> impl Iterator<Item = (&ConnectionId, &Occupant)> + '_ {
        self.rooms.get(&room).into_iter().flat_map(|o| o.iter())
    }

    /// Membership snapshot: one entry per user, ordered by user id.
    pub fn snapshot(&self, room: RoomKey) -> Vec<Occupant> {
        let mut by_user: BTreeMap<i64, Occupant> = BTreeMap::new();
        for (_, occupant) in self.occupants(room) {
            by_user
                .entry(occupant.user_id)
                .or_insert_with(|| occupant.clone());
        }
        by_user.into_values().collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}
