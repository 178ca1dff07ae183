//! Presence state and fan-out.

use std::collections::{BTreeSet, HashMap};

use super::room_directory::RoomDirectory;
use crate::domain::entities::UserStatus;
use crate::domain::value_objects::{ConnectionId, RoomKey};

/// Live status of every user with at least one authenticated session.
#[derive(Debug, Default)]
pub struct PresenceMap {
    statuses: HashMap<i64, UserStatus>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live status, `Offline` when the user has no session.
    pub fn status(&self, user_id: i64) -> UserStatus {
        self.statuses.get(&user_id).copied().unwrap_or_default()
    }

    /// Record a status. Returns the previous status.
    pub fn set(&mut self, user_id: i64, status: UserStatus) -> UserStatus {
        if status == UserStatus::Offline {
            self.statuses.remove(&user_id).unwrap_or_default()
        } else {
            self.statuses.insert(user_id, status).unwrap_or_default()
        }
    }

    pub fn online_count(&self) -> usize {
        self.statuses.len()
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
    }
}

/// Status as shown to other users; invisible users appear offline.
pub fn visible_status(status: UserStatus) -> UserStatus {
    match status {
        UserStatus::Invisible => UserStatus::Offline,
        other => other,
    }
}

/// Connections that must hear about a status change of `user_id`.
///
/// Every connection of a friend (via their personal rooms) plus every
/// connection subscribed to one of the user's server rooms, minus the
/// user's own connections. Each connection appears once.
pub fn presence_audience(
    rooms: &RoomDirectory,
    user_id: i64,
    friend_ids: &[i64],
    server_ids: &[i64],
) -> BTreeSet<ConnectionId> {
    let friends = friend_ids
        .iter()
        .filter(|id| **id != user_id)
        .flat_map(|id| rooms.connections(RoomKey::User(*id)));

    let co_members = server_ids.iter().flat_map(|id| {
        rooms
            .occupants(RoomKey::Server(*id))
            .filter(|(_, occupant)| occupant.user_id != user_id)
            .map(|(conn, _)| *conn)
            .collect::<Vec<_>>()
    });

    friends.chain(co_members).collect()
}
