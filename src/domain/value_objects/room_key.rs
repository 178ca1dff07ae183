use serde::Serialize;

/// Address of a fan-out room.
///
/// Personal rooms deliver DMs and presence to every connection of one
/// user, server rooms reach everyone subscribed to a server, and channel
/// rooms hold the connections currently viewing a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RoomKey {
    User(i64),
    Server(i64),
    Channel(i64),
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomKey::User(id) => write!(f, "user:{}", id),
            RoomKey::Server(id) => write!(f, "server:{}", id),
            RoomKey::Channel(id) => write!(f, "channel:{}", id),
        }
    }
}
