//! Connection manager. Owns the connection lifecycle (register, unregister)
//! and routes inbound messages to rooms, presence, and notifications.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use creatorhub_core::config::RealtimeConfig;
use creatorhub_core::traits::VerifiedIdentity;
use creatorhub_core::types::id::{ConnectionId, UserId};
use creatorhub_core::{AppError, AppResult};
use creatorhub_protocol::builder::{
    build_chat_message, build_error, build_stream_chat, build_stream_gift, build_typing,
    build_viewer_count,
};
use creatorhub_protocol::serializer::decode_client;
use creatorhub_protocol::validator::{validate_content, validate_frame, validate_gift};
use creatorhub_protocol::{ClientMessage, RoomKey, ServerMessage};

use crate::metrics::RealtimeMetrics;
use crate::notification::dispatcher::NotificationDispatcher;
use crate::presence::tracker::PresenceTracker;
use crate::room::registry::RoomRegistry;

use super::authenticator::ConnectionAuthenticator;
use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;

/// Manages all authenticated relay connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Room registry.
    rooms: Arc<RoomRegistry>,
    /// Presence tracker.
    presence: Arc<PresenceTracker>,
    /// Notification dispatcher.
    notifications: Arc<NotificationDispatcher>,
    /// Credential gate.
    authenticator: ConnectionAuthenticator,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
    /// Parent of every connection's cancellation token.
    shutdown: CancellationToken,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RealtimeConfig,
        pool: Arc<ConnectionPool>,
        rooms: Arc<RoomRegistry>,
        presence: Arc<PresenceTracker>,
        notifications: Arc<NotificationDispatcher>,
        authenticator: ConnectionAuthenticator,
        metrics: Arc<RealtimeMetrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            rooms,
            presence,
            notifications,
            authenticator,
            metrics,
            config,
            shutdown,
        }
    }

    /// Validates the first frame of a fresh connection.
    pub async fn authenticate(&self, raw: &str) -> AppResult<VerifiedIdentity> {
        let result = self.authenticator.authenticate_frame(raw).await;
        if let Err(e) = &result {
            self.metrics.auth_failed();
            debug!(error = %e, "Credential rejected");
        }
        result
    }

    /// Registers a new authenticated connection.
    ///
    /// Queues `authenticated` followed by the initial `notification_stats`
    /// and marks the user online. When the user already holds the maximum
    /// number of connections, the oldest is sent a `CAPACITY` error and
    /// closed.
    pub async fn register(
        &self,
        identity: VerifiedIdentity,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(
            identity,
            tx,
            self.shutdown.child_token(),
        ));
        let user_id = handle.user_id;

        handle.send(ServerMessage::Authenticated {
            user_id,
            features: self.config.features.clone(),
        });
        handle.send(ServerMessage::NotificationStats(
            self.notifications.stats(&user_id),
        ));

        let evicted = self
            .pool
            .add_capped(handle.clone(), self.config.max_connections_per_user);
        for old in evicted {
            warn!(
                conn_id = %old.id,
                user_id = %user_id,
                max = self.config.max_connections_per_user,
                "User at max connections, closing oldest"
            );
            old.send(build_error(&AppError::capacity(format!(
                "Connection limit of {} reached; closing oldest connection",
                self.config.max_connections_per_user
            ))));
            self.metrics.connection_evicted();
            self.cleanup(&old, true);
            old.close();
        }

        self.metrics.connection_opened();
        self.presence.connected(user_id).await;

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            "Relay connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection: leaves its rooms, discards its pending
    /// batch, and schedules the offline transition when it was the user's
    /// last connection. Safe to call more than once.
    pub fn unregister(&self, handle: &Arc<ConnectionHandle>) {
        handle.close();
        let was_registered = self.pool.remove(&handle.id).is_some();
        self.cleanup(handle, was_registered);
        if was_registered {
            info!(
                conn_id = %handle.id,
                user_id = %handle.user_id,
                "Relay connection unregistered"
            );
        }
    }

    fn cleanup(&self, handle: &ConnectionHandle, was_registered: bool) {
        for (room, remaining) in self.rooms.leave_all(handle.id) {
            if room.is_stream() && remaining > 0 {
                self.publish(&room, build_viewer_count(room.id(), remaining), None);
            }
        }
        self.notifications.unsubscribe(handle);

        if was_registered {
            self.metrics.connection_closed();
            if !self.pool.has_user(&handle.user_id) {
                self.presence.disconnected(handle.user_id);
            }
        }
    }

    /// Processes an inbound text frame from an authenticated connection.
    /// Failures are reported to the client as `error` events.
    pub async fn handle_inbound(&self, handle: &Arc<ConnectionHandle>, raw: &str) {
        self.metrics.message_received();

        let result = match validate_frame(raw, self.config.max_message_size)
            .and_then(|()| decode_client(raw))
        {
            Ok(msg) => {
                debug!(conn_id = %handle.id, event = msg.event_name(), "Inbound message");
                self.route(handle, msg).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.metrics.message_rejected();
            debug!(conn_id = %handle.id, error = %e, "Inbound message refused");
            handle.send(build_error(&e));
        }
    }

    async fn route(&self, handle: &Arc<ConnectionHandle>, msg: ClientMessage) -> AppResult<()> {
        let user_id = handle.user_id;
        match msg {
            ClientMessage::Authenticate { .. } => {
                Err(AppError::validation("Connection is already authenticated"))
            }
            ClientMessage::SubscribeNotifications(preference) => {
                self.notifications.subscribe(handle, preference.clone());
                self.reply(handle, ServerMessage::NotificationPreferences(Some(preference)));
                Ok(())
            }
            ClientMessage::UnsubscribeNotifications => {
                self.notifications.unsubscribe(handle);
                self.reply(handle, ServerMessage::NotificationPreferences(None));
                Ok(())
            }
            ClientMessage::MarkNotificationRead { notification_id } => {
                let outcome = self.notifications.mark_read(&user_id, &notification_id)?;
                let ack = ServerMessage::NotificationRead {
                    notification_id,
                    unread: outcome.unread,
                };
                // Other devices only hear about actual changes.
                if outcome.changed {
                    self.send_to_user(&user_id, &ack);
                } else {
                    self.reply(handle, ack);
                }
                Ok(())
            }
            ClientMessage::GetNotificationStats => {
                let stats = self.notifications.stats(&user_id);
                self.reply(handle, ServerMessage::NotificationStats(stats));
                Ok(())
            }
            ClientMessage::UpdatePresence(update) => {
                self.presence.update(user_id, update).await?;
                Ok(())
            }
            ClientMessage::GetActivityHistory { limit } => {
                let events = self.presence.activity_history(user_id, limit).await?;
                self.reply(handle, ServerMessage::ActivityHistory(events));
                Ok(())
            }
            ClientMessage::GetOnlineConnections => {
                let online = self.presence.online_visible_to(user_id).await?;
                self.reply(handle, ServerMessage::OnlineConnections(online));
                Ok(())
            }
            ClientMessage::JoinRoom { room } => self.join(handle, RoomKey::parse(&room)?),
            ClientMessage::LeaveRoom { room } => self.leave(handle, RoomKey::parse(&room)?),
            ClientMessage::JoinStream { stream_id } => self.join(handle, RoomKey::stream(stream_id)?),
            ClientMessage::LeaveStream { stream_id } => {
                self.leave(handle, RoomKey::stream(stream_id)?)
            }
            ClientMessage::JoinPostRoom { post_id } => self.join(handle, RoomKey::post(post_id)?),
            ClientMessage::LeavePostRoom { post_id } => self.leave(handle, RoomKey::post(post_id)?),
            ClientMessage::JoinChatSession { chat_id } => self.join(handle, RoomKey::chat(chat_id)?),
            ClientMessage::LeaveChatSession { chat_id } => {
                self.leave(handle, RoomKey::chat(chat_id)?)
            }
            ClientMessage::SendMessage {
                chat_id,
                content,
                message_type,
            } => {
                let room = RoomKey::chat(chat_id)?;
                validate_content(&content)?;
                let msg = build_chat_message(room.id(), user_id, content, message_type);
                self.publish(&room, msg, None);
                Ok(())
            }
            ClientMessage::TypingStart { chat_id } => {
                let room = RoomKey::chat(chat_id)?;
                self.publish(&room, build_typing(room.id(), user_id, true), Some(handle.id));
                Ok(())
            }
            ClientMessage::TypingStop { chat_id } => {
                let room = RoomKey::chat(chat_id)?;
                self.publish(&room, build_typing(room.id(), user_id, false), Some(handle.id));
                Ok(())
            }
            ClientMessage::StreamChatMessage { stream_id, content } => {
                let room = RoomKey::stream(stream_id)?;
                validate_content(&content)?;
                self.publish(&room, build_stream_chat(room.id(), user_id, content), None);
                Ok(())
            }
            ClientMessage::SendStreamGift {
                stream_id,
                gift_type,
                amount,
            } => {
                let room = RoomKey::stream(stream_id)?;
                validate_gift(&gift_type, amount)?;
                self.publish(
                    &room,
                    build_stream_gift(room.id(), user_id, gift_type, amount),
                    None,
                );
                Ok(())
            }
            ClientMessage::TogglePostLike { post_id, liked } => {
                let room = RoomKey::post(post_id)?;
                let msg = ServerMessage::PostLikeUpdate {
                    post_id: room.id().to_string(),
                    user_id,
                    liked,
                };
                self.publish(&room, msg, None);
                Ok(())
            }
        }
    }

    /// Adds a connection to a room after checking the per-connection caps.
    fn join(&self, handle: &ConnectionHandle, room: RoomKey) -> AppResult<()> {
        if !self.rooms.is_member(&room, handle.id) {
            if self.rooms.room_count_for(handle.id) >= self.config.max_rooms_per_connection {
                return Err(AppError::capacity(format!(
                    "Room limit of {} reached",
                    self.config.max_rooms_per_connection
                )));
            }
            if room.is_stream()
                && self.rooms.stream_count_for(handle.id)
                    >= self.config.max_stream_joins_per_connection
            {
                return Err(AppError::capacity(format!(
                    "Concurrent stream limit of {} reached",
                    self.config.max_stream_joins_per_connection
                )));
            }
        }

        let members = self.rooms.join(&room, handle.id);
        self.metrics.room_joined();
        self.reply(
            handle,
            ServerMessage::RoomJoined {
                room: room.to_room_name(),
                members,
            },
        );
        if room.is_stream() {
            self.publish(&room, build_viewer_count(room.id(), members), None);
        }

        debug!(conn_id = %handle.id, room = %room, members, "Joined room");
        Ok(())
    }

    fn leave(&self, handle: &ConnectionHandle, room: RoomKey) -> AppResult<()> {
        let remaining = self.rooms.leave(&room, handle.id);
        self.reply(
            handle,
            ServerMessage::RoomLeft {
                room: room.to_room_name(),
            },
        );
        if let Some(remaining) = remaining {
            if room.is_stream() && remaining > 0 {
                self.publish(&room, build_viewer_count(room.id(), remaining), None);
            }
            debug!(conn_id = %handle.id, room = %room, remaining, "Left room");
        }
        Ok(())
    }

    fn reply(&self, handle: &ConnectionHandle, msg: ServerMessage) {
        let sent = handle.send(msg);
        self.metrics.record_send(sent);
    }

    /// Delivers a message to every current member of a room, optionally
    /// skipping one connection. Returns the number of connections reached.
    pub fn publish(&self, room: &RoomKey, msg: ServerMessage, except: Option<ConnectionId>) -> usize {
        let mut sent = 0;
        for conn_id in self.rooms.members(room) {
            if Some(conn_id) == except {
                continue;
            }
            if let Some(conn) = self.pool.get(&conn_id) {
                let delivered = conn.send(msg.clone());
                self.metrics.record_send(delivered);
                if delivered {
                    sent += 1;
                }
            }
        }
        sent
    }

    /// Sends a message to every connection of a user.
    pub fn send_to_user(&self, user_id: &UserId, msg: &ServerMessage) -> usize {
        let mut sent = 0;
        for conn in self.pool.user_connections(user_id) {
            let delivered = conn.send(msg.clone());
            self.metrics.record_send(delivered);
            if delivered {
                sent += 1;
            }
        }
        sent
    }

    /// Closes all connections.
    pub fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            conn.close();
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Returns a reference to the room registry.
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// Returns the relay configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}
