//! In-memory persistence collaborator.
//!
//! Implements every repository trait over concurrent maps. Stands in for
//! the durable store: nothing survives a restart. The store is seeded
//! with one default server that newly registered users join.

mod dm_repository;
mod message_repository;
mod server_repository;
mod user_repository;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

use crate::domain::{Channel, ChannelType, DmPair, DmRoom, Message, Server, User};

pub const DEFAULT_SERVER_ID: i64 = 1;
pub const GENERAL_CHANNEL_ID: i64 = 10;
pub const RANDOM_CHANNEL_ID: i64 = 11;
pub const ANNOUNCEMENTS_CHANNEL_ID: i64 = 12;
pub const VOICE_CHANNEL_ID: i64 = 13;

#[derive(Debug, Default)]
struct DmIndex {
    by_pair: HashMap<DmPair, DmRoom>,
    by_channel: HashMap<i64, DmPair>,
}

/// Concurrent in-memory store.
#[derive(Debug)]
pub struct InMemoryStore {
    users: DashMap<i64, User>,
    friendships: DashMap<i64, BTreeSet<i64>>,
    servers: DashMap<i64, Server>,
    channels: DashMap<i64, Channel>,
    /// server id -> member user ids
    members: DashMap<i64, BTreeSet<i64>>,
    messages: DashMap<i64, Message>,
    /// Pair lookup and room creation happen under one lock
    dm_rooms: Mutex<DmIndex>,
    /// Register unknown identities on first authentication
    open_registration: bool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Seeded store that registers unknown identities.
    pub fn new() -> Self {
        let store = Self {
            users: DashMap::new(),
            friendships: DashMap::new(),
            servers: DashMap::new(),
            channels: DashMap::new(),
            members: DashMap::new(),
            messages: DashMap::new(),
            dm_rooms: Mutex::new(DmIndex::default()),
            open_registration: true,
        };
        store.seed();
        store
    }

    /// Seeded store that refuses identities it does not already know.
    pub fn closed() -> Self {
        Self {
            open_registration: false,
            ..Self::new()
        }
    }

    fn seed(&self) {
        self.insert_server(DEFAULT_SERVER_ID, "My Server", false);
        for (id, name, kind) in [
            (GENERAL_CHANNEL_ID, "general", ChannelType::Text),
            (RANDOM_CHANNEL_ID, "random", ChannelType::Text),
            (ANNOUNCEMENTS_CHANNEL_ID, "announcements", ChannelType::Text),
            (VOICE_CHANNEL_ID, "voice", ChannelType::Voice),
        ] {
            self.insert_channel(id, DEFAULT_SERVER_ID, name, kind);
        }
    }

    fn insert_server(&self, id: i64, name: &str, is_virtual: bool) {
        self.servers.insert(
            id,
            Server {
                id,
                name: name.to_string(),
                is_virtual,
                created_at: Utc::now(),
            },
        );
        self.members.entry(id).or_default();
    }

    fn insert_channel(&self, id: i64, server_id: i64, name: &str, channel_type: ChannelType) {
        self.channels.insert(
            id,
            Channel {
                id,
                server_id,
                name: name.to_string(),
                channel_type,
                created_at: Utc::now(),
            },
        );
    }

    /// Store a user (replacing any previous profile) without joining any server.
    pub fn insert_user(&self, id: i64, username: &str) -> User {
        let user = User::new(id, username);
        self.users.insert(id, user.clone());
        user
    }

    /// Add a server with no channels. Returns false if the id is taken.
    pub fn create_server(&self, id: i64, name: &str) -> bool {
        if self.servers.contains_key(&id) {
            return false;
        }
        self.insert_server(id, name, false);
        true
    }

    pub fn add_server_member(&self, server_id: i64, user_id: i64) {
        self.members.entry(server_id).or_default().insert(user_id);
    }

    pub fn add_friendship(&self, a: i64, b: i64) {
        self.friendships.entry(a).or_default().insert(b);
        self.friendships.entry(b).or_default().insert(a);
    }

    /// Create the DM room for `pair` directly, with fixed ids derived from the pair.
    pub fn seed_dm(&self, pair: DmPair) -> DmRoom {
        let base = 1_000_000 + pair.low() * 1_000 + pair.high();
        let room = DmRoom {
            id: base,
            channel_id: base + 500_000_000,
            pair,
            created_at: Utc::now(),
        };
        self.store_dm(&mut self.dm_rooms.lock(), room)
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    pub fn message(&self, id: i64) -> Option<Message> {
        self.messages.get(&id).map(|m| m.clone())
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn dm_room_count(&self) -> usize {
        self.dm_rooms.lock().by_pair.len()
    }

    /// Channels of a server, ascending by id.
    pub fn channels_of(&self, server_id: i64) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .channels
            .iter()
            .filter(|c| c.server_id == server_id)
            .map(|c| c.clone())
            .collect();
        channels.sort_by_key(|c| c.id);
        channels
    }

    /// Member ids of a server, ascending.
    pub fn member_ids(&self, server_id: i64) -> Vec<i64> {
        self.members
            .get(&server_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Persist a DM room with its virtual server, channel and both members.
    /// Returns the room already stored for the pair when there is one.
    fn store_dm(&self, index: &mut DmIndex, room: DmRoom) -> DmRoom {
        if let Some(existing) = index.by_pair.get(&room.pair) {
            return existing.clone();
        }

        self.insert_server(room.id, &format!("dm-{}-{}", room.pair.low(), room.pair.high()), true);
        self.insert_channel(room.channel_id, room.id, "dm", ChannelType::Dm);
        for user_id in room.pair.members() {
            self.add_server_member(room.id, user_id);
        }

        index.by_channel.insert(room.channel_id, room.pair);
        index.by_pair.insert(room.pair, room.clone());
        room
    }
}
