//! Application-facing relay client.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use creatorhub_core::config::ClientConfig;
use creatorhub_core::types::id::{NotificationId, UserId};
use creatorhub_entity::notification::SubscriptionPreference;
use creatorhub_entity::presence::PresenceStatus;
use creatorhub_protocol::{ClientMessage, PresenceUpdate, RoomKey};

use crate::channel::{Channel, Shared};
use crate::events::{ClientEvent, EventKind, Handler};
use crate::notifier::{NoopNotifier, Notifier};
use crate::state::{ConnectionState, ConnectionStateMachine, ReconnectPolicy};

/// Running driver task and the token that stops it.
#[derive(Debug)]
struct Driver {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Client for the CreatorHub relay.
///
/// Construct one per application and pass it down; it is cheap to share
/// behind an `Arc`. Operations are fire-and-forget: each returns whether
/// it was queued, and is silently dropped while not connected. Server
/// replies and pushes arrive through handlers registered with
/// [`RelayClient::on`].
#[derive(Debug)]
pub struct RelayClient {
    endpoint: String,
    connect_timeout: Duration,
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl RelayClient {
    /// Create a client from configuration. Nothing connects until
    /// [`RelayClient::connect`].
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_notifier(config, Arc::new(NoopNotifier))
    }

    /// Create a client that surfaces every live notification through
    /// `notifier`.
    pub fn with_notifier(config: &ClientConfig, notifier: Arc<dyn Notifier>) -> Self {
        let machine = ConnectionStateMachine::new(ReconnectPolicy::from(&config.reconnect));
        Self {
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout(),
            shared: Arc::new(Shared::new(machine, notifier)),
            driver: Mutex::new(None),
        }
    }

    /// Open the channel and authenticate with `credential`.
    ///
    /// Returns immediately; watch for [`EventKind::Authenticated`] or
    /// [`EventKind::AuthError`]. A call while a channel is already running
    /// is ignored. Must be called within a Tokio runtime.
    pub fn connect(&self, credential: impl Into<String>) {
        let mut driver = self.driver.lock().unwrap_or_else(|e| e.into_inner());
        if driver.as_ref().is_some_and(|d| !d.task.is_finished()) {
            debug!("Connect ignored, channel already running");
            return;
        }

        self.shared.reset_session();
        self.shared.open_gate();
        self.shared.transition(|m| m.connect_requested());

        let cancel = CancellationToken::new();
        let channel = Channel::new(
            self.endpoint.clone(),
            credential.into(),
            self.connect_timeout,
            self.shared.clone(),
            cancel.clone(),
        );
        info!(endpoint = %self.endpoint, "Connecting to relay");
        *driver = Some(Driver {
            cancel,
            task: tokio::spawn(channel.run()),
        });
    }

    /// Close the channel and stop reconnecting.
    ///
    /// Cancels a pending backoff timer, closes the transport, forgets
    /// joined rooms, and clears local presence, in that order. No event
    /// reaches a handler after this returns.
    pub async fn disconnect(&self) {
        self.shared.close_gate();
        self.shared.transition(|m| m.disconnect_requested());

        let driver = self
            .driver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(driver) = driver {
            driver.cancel.cancel();
            let _ = driver.task.await;
        }
        // The driver may have completed a handshake before it saw the cancel.
        self.shared.transition(|m| m.disconnect_requested());

        self.shared.clear_rooms();
        self.shared.set_presence(None);
        info!(endpoint = %self.endpoint, "Disconnected from relay");
    }

    /// Register `handler` for `kind`. Returns the handle to pass to
    /// [`RelayClient::off`].
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Handler
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        self.shared.events.on(kind, handler.clone());
        handler
    }

    /// Remove exactly `handler` from `kind`.
    pub fn off(&self, kind: EventKind, handler: &Handler) -> bool {
        self.shared.events.off(kind, handler)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Whether operations are currently sent.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// The authenticated user, once known.
    pub fn user_id(&self) -> Option<UserId> {
        self.shared.user_id()
    }

    /// Rooms the relay has acknowledged joining.
    pub fn joined_rooms(&self) -> Vec<RoomKey> {
        self.shared.rooms()
    }

    /// Own presence as last set through this client; `None` when not connected.
    pub fn local_presence(&self) -> Option<PresenceStatus> {
        self.shared.presence()
    }

    /// Send a raw protocol message. Prefer the typed operations.
    pub fn send(&self, msg: ClientMessage) -> bool {
        self.shared.send(msg)
    }

    // ── Notifications ────────────────────────────────────────

    /// Replace this connection's notification preference.
    pub fn subscribe_notifications(&self, preference: SubscriptionPreference) -> bool {
        self.send(ClientMessage::SubscribeNotifications(preference))
    }

    /// Stop live notification pushes on this connection.
    pub fn unsubscribe_notifications(&self) -> bool {
        self.send(ClientMessage::UnsubscribeNotifications)
    }

    /// Mark one notification read. Idempotent.
    pub fn mark_notification_read(&self, notification_id: NotificationId) -> bool {
        self.send(ClientMessage::MarkNotificationRead { notification_id })
    }

    /// Ask for `notification_stats`.
    pub fn get_notification_stats(&self) -> bool {
        self.send(ClientMessage::GetNotificationStats)
    }

    // ── Presence ─────────────────────────────────────────────

    /// Publish a presence change.
    pub fn update_presence(&self, update: PresenceUpdate) -> bool {
        let status = update.status;
        let sent = self.send(ClientMessage::UpdatePresence(update));
        if sent {
            self.shared.set_presence(Some(status));
        }
        sent
    }

    /// Ask for recent activity, newest first.
    pub fn get_activity_history(&self, limit: Option<usize>) -> bool {
        self.send(ClientMessage::GetActivityHistory { limit })
    }

    /// Ask for the online users visible to this user.
    pub fn get_online_connections(&self) -> bool {
        self.send(ClientMessage::GetOnlineConnections)
    }

    // ── Rooms ────────────────────────────────────────────────

    /// Join any room.
    pub fn join_room(&self, room: &RoomKey) -> bool {
        self.send(ClientMessage::JoinRoom {
            room: room.to_room_name(),
        })
    }

    /// Leave any room.
    pub fn leave_room(&self, room: &RoomKey) -> bool {
        self.send(ClientMessage::LeaveRoom {
            room: room.to_room_name(),
        })
    }

    /// Watch a live stream.
    pub fn join_stream(&self, stream_id: impl Into<String>) -> bool {
        self.send(ClientMessage::JoinStream {
            stream_id: stream_id.into(),
        })
    }

    /// Stop watching a live stream.
    pub fn leave_stream(&self, stream_id: impl Into<String>) -> bool {
        self.send(ClientMessage::LeaveStream {
            stream_id: stream_id.into(),
        })
    }

    /// Follow a post's live counters.
    pub fn join_post_room(&self, post_id: impl Into<String>) -> bool {
        self.send(ClientMessage::JoinPostRoom {
            post_id: post_id.into(),
        })
    }

    /// Stop following a post.
    pub fn leave_post_room(&self, post_id: impl Into<String>) -> bool {
        self.send(ClientMessage::LeavePostRoom {
            post_id: post_id.into(),
        })
    }

    /// Open a chat session.
    pub fn join_chat_session(&self, chat_id: impl Into<String>) -> bool {
        self.send(ClientMessage::JoinChatSession {
            chat_id: chat_id.into(),
        })
    }

    /// Close a chat session.
    pub fn leave_chat_session(&self, chat_id: impl Into<String>) -> bool {
        self.send(ClientMessage::LeaveChatSession {
            chat_id: chat_id.into(),
        })
    }

    // ── Publishing ───────────────────────────────────────────

    /// Send a chat message.
    pub fn send_message(
        &self,
        chat_id: impl Into<String>,
        content: impl Into<String>,
        message_type: Option<String>,
    ) -> bool {
        self.send(ClientMessage::SendMessage {
            chat_id: chat_id.into(),
            content: content.into(),
            message_type,
        })
    }

    /// Start or stop the typing indicator.
    pub fn set_typing(&self, chat_id: impl Into<String>, typing: bool) -> bool {
        let chat_id = chat_id.into();
        if typing {
            self.send(ClientMessage::TypingStart { chat_id })
        } else {
            self.send(ClientMessage::TypingStop { chat_id })
        }
    }

    /// Post to a stream's live chat.
    pub fn send_stream_chat(&self, stream_id: impl Into<String>, content: impl Into<String>) -> bool {
        self.send(ClientMessage::StreamChatMessage {
            stream_id: stream_id.into(),
            content: content.into(),
        })
    }

    /// Send a gift to a stream.
    pub fn send_stream_gift(
        &self,
        stream_id: impl Into<String>,
        gift_type: impl Into<String>,
        amount: u64,
    ) -> bool {
        self.send(ClientMessage::SendStreamGift {
            stream_id: stream_id.into(),
            gift_type: gift_type.into(),
            amount,
        })
    }

    /// Like or unlike a post.
    pub fn toggle_post_like(&self, post_id: impl Into<String>, liked: bool) -> bool {
        self.send(ClientMessage::TogglePostLike {
            post_id: post_id.into(),
            liked,
        })
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        if let Some(driver) = self
            .driver
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            driver.cancel.cancel();
        }
    }
}
