//! WebSocket Session Management

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use super::messages::{ClientEvent, ServerEvent};
use crate::domain::{ConnectionId, User};

/// Deferred events a single connection may hold while an I/O job runs.
pub const MAX_BACKLOG: usize = 64;

/// Dispatcher-side state of one live connection.
#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    pub sender: UnboundedSender<ServerEvent>,
    /// Bound identity, `None` until authenticated
    pub user: Option<User>,
    /// Text channel room currently occupied
    pub channel_id: Option<i64>,
    /// Voice room currently occupied
    pub voice_channel_id: Option<i64>,
    /// Server rooms this connection is subscribed to
    pub servers: BTreeSet<i64>,
    /// An I/O job for this connection is outstanding
    pub in_flight: bool,
    /// Events deferred until the outstanding job completes
    pub backlog: VecDeque<ClientEvent>,
    pub connected_at: Instant,
}

impl Session {
    pub fn new(id: ConnectionId, sender: UnboundedSender<ServerEvent>) -> Self {
        Self {
            id,
            sender,
            user: None,
            channel_id: None,
            voice_channel_id: None,
            servers: BTreeSet::new(),
            in_flight: false,
            backlog: VecDeque::new(),
            connected_at: Instant::now(),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Defer `event` until the outstanding job completes. Returns false,
    /// dropping the event, once the backlog is full.
    pub fn defer(&mut self, event: ClientEvent) -> bool {
        if self.backlog.len() >= MAX_BACKLOG {
            return false;
        }
        self.backlog.push_back(event);
        true
    }

    /// Queue an event for this connection. A closed receiver means the
    /// connection is going away; its disconnect will follow.
    pub fn send(&self, event: ServerEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!(connection_id = %self.id, "Dropped event for closing connection");
        }
    }
}

/// All live sessions, indexed by connection and by user.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
    by_user: HashMap<i64, BTreeSet<ConnectionId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    pub fn get(&self, conn: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    pub fn get_mut(&mut self, conn: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(&conn)
    }

    /// Bind a user to a session. Returns how many sessions the user now has.
    pub fn bind(&mut self, conn: ConnectionId, user: User) -> usize {
        let Some(session) = self.sessions.get_mut(&conn) else {
            return 0;
        };
        let connections = self.by_user.entry(user.id).or_default();
        connections.insert(conn);
        session.user = Some(user);
        connections.len()
    }

    /// Remove a session, unindexing its user.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&conn)?;
        if let Some(user_id) = session.user_id() {
            if let Some(connections) = self.by_user.get_mut(&user_id) {
                connections.remove(&conn);
                if connections.is_empty() {
                    self.by_user.remove(&user_id);
                }
            }
        }
        Some(session)
    }

    /// Live connections of a user.
    pub fn connections_of(&self, user_id: i64) -> Vec<ConnectionId> {
        self.by_user
            .get(&user_id)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn session_count(&self, user_id: i64) -> usize {
        self.by_user.get(&user_id).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn authenticated_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_authenticated()).count()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
        self.by_user.clear();
    }
}

/// Liveness tracking kept by the connection task.
#[derive(Debug)]
pub struct Heartbeat {
    last: Instant,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    pub fn beat(&mut self) {
        self.last = Instant::now();
    }

    pub fn is_alive(&self, timeout: Duration) -> bool {
        self.last.elapsed() < timeout
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}
