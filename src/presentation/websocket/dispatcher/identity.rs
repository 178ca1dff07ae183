//! Authentication, presence and status.

use std::collections::BTreeSet;

use super::{Completion, Dispatcher, PresenceProfile};
use crate::application::dto::UserResponse;
use crate::domain::services::{presence_audience, visible_status, Occupant};
use crate::domain::{ConnectionId, RoomKey, User, UserStatus};
use crate::presentation::websocket::messages::{
    AuthenticatePayload, OnlineUsersPayload, ServerEvent, StatusPayload,
};
use crate::shared::error::GatewayError;
use crate::shared::validation::validate_payload;

impl Dispatcher {
    pub(super) fn authenticate(
        &mut self,
        conn: ConnectionId,
        payload: AuthenticatePayload,
    ) -> Result<(), GatewayError> {
        validate_payload(&payload)?;

        let bound = self.registry.sessions.get(conn).and_then(|s| s.user.clone());
        if let Some(user) = bound {
            if user.id != payload.user_id {
                return Err(GatewayError::AlreadyAuthenticated);
            }
            self.send_ready(conn, user);
            return Ok(());
        }

        self.ctx
            .auth
            .verify_identity(payload.user_id, payload.token.as_deref())?;

        let users = self.ctx.users.clone();
        let servers = self.ctx.servers.clone();
        self.spawn_io(conn, "authenticate", async move {
            let user_id = payload.user_id;
            let user = users
                .resolve_identity(user_id, &payload.username)
                .await?
                .ok_or_else(|| GatewayError::NotFound(format!("User {} not found", user_id)))?;
            let server_ids = servers.server_ids_for_user(user_id).await?;
            let friend_ids = users.friend_ids(user_id).await?;
            Ok::<_, GatewayError>(Completion::Authenticated {
                user,
                server_ids,
                friend_ids,
            })
        });
        Ok(())
    }

    /// Bind a resolved identity to its connection.
    pub(super) fn authenticated(
        &mut self,
        conn: ConnectionId,
        user: User,
        server_ids: Vec<i64>,
        friend_ids: Vec<i64>,
    ) {
        if self.registry.sessions.get(conn).is_none() {
            return;
        }

        let sessions = self.registry.sessions.bind(conn, user.clone());
        let occupant = Occupant {
            user_id: user.id,
            username: user.username.clone(),
        };
        self.registry
            .rooms
            .join(RoomKey::User(user.id), conn, occupant.clone());

        let servers: BTreeSet<i64> = server_ids.into_iter().collect();
        for server_id in &servers {
            self.registry
                .rooms
                .join(RoomKey::Server(*server_id), conn, occupant.clone());
        }
        if let Some(session) = self.registry.sessions.get_mut(conn) {
            session.servers = servers.clone();
        }
        self.registry.profiles.insert(
            user.id,
            PresenceProfile {
                friend_ids,
                server_ids: servers,
            },
        );

        if sessions == 1 {
            self.registry.presence.set(user.id, UserStatus::Online);
            self.fan_out_status(&user, UserStatus::Online);
            self.persist_status(user.id, UserStatus::Online);
        }

        tracing::info!(
            connection_id = %conn,
            user_id = user.id,
            sessions,
            "User authenticated"
        );
        self.update_connection_metrics();
        self.send_ready(conn, user);
    }

    fn send_ready(&self, conn: ConnectionId, user: User) {
        let server_ids = self
            .registry
            .sessions
            .get(conn)
            .map(|s| s.servers.iter().copied().collect())
            .unwrap_or_default();
        let status = self.registry.presence.status(user.id);
        self.send(
            conn,
            ServerEvent::Ready {
                session_id: conn,
                user: UserResponse::from_user(user, status),
                server_ids,
            },
        );
    }

    /// Tell friends and co-members about a user's status as they should see it.
    fn fan_out_status(&self, user: &User, status: UserStatus) {
        let Some(profile) = self.registry.profiles.get(&user.id) else {
            return;
        };
        let server_ids: Vec<i64> = profile.server_ids.iter().copied().collect();
        let audience = presence_audience(
            &self.registry.rooms,
            user.id,
            &profile.friend_ids,
            &server_ids,
        );

        let event = ServerEvent::StatusUpdate {
            user_id: user.id,
            username: user.username.clone(),
            status: visible_status(status),
        };
        self.send_all(audience, &event);
    }

    /// The last session of `user` is gone.
    pub(super) fn went_offline(&mut self, user: &User) {
        let previous = self.registry.presence.set(user.id, UserStatus::Offline);
        if visible_status(previous) != UserStatus::Offline {
            self.fan_out_status(user, UserStatus::Offline);
        }
        self.registry.profiles.remove(&user.id);
        self.persist_status(user.id, UserStatus::Offline);
        tracing::info!(user_id = user.id, "User went offline");
    }

    pub(super) fn change_status(
        &mut self,
        conn: ConnectionId,
        payload: StatusPayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        let status: UserStatus = payload.status.parse()?;
        if status == UserStatus::Offline {
            return Err(GatewayError::Validation(
                "Connected users cannot be offline, use 'invisible'".into(),
            ));
        }

        let previous = self.registry.presence.set(user.id, status);
        if visible_status(previous) != visible_status(status) {
            self.fan_out_status(&user, status);
        }
        self.persist_status(user.id, status);
        tracing::debug!(user_id = user.id, %previous, %status, "Status changed");
        Ok(())
    }

    pub(super) fn request_online_users(
        &mut self,
        conn: ConnectionId,
        payload: OnlineUsersPayload,
    ) -> Result<(), GatewayError> {
        validate_payload(&payload)?;
        self.identity(conn)?;

        let servers = self.ctx.servers.clone();
        self.spawn_io(conn, "users:online", async move {
            let mut users: Vec<User> = Vec::new();
            for server_id in payload.server_ids {
                for member in servers.members(server_id).await? {
                    if !users.iter().any(|u| u.id == member.id) {
                        users.push(member);
                    }
                }
            }
            Ok::<_, GatewayError>(Completion::OnlineUsers(users))
        });
        Ok(())
    }

    pub(super) fn online_users(&mut self, conn: ConnectionId, users: Vec<User>) {
        let users = users
            .into_iter()
            .filter_map(|user| {
                let status = visible_status(self.registry.presence.status(user.id));
                status
                    .is_online()
                    .then(|| UserResponse::from_user(user, status))
            })
            .collect();
        self.send(conn, ServerEvent::UsersOnline { users });
    }
}
