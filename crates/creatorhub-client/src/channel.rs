//! WebSocket channel to the relay.
//!
//! One driver task per `connect` call owns the socket. It sends the
//! credential as the first frame, forwards queued operations, re-publishes
//! every push, and on an unexpected close walks the reconnect state
//! machine until it reconnects, gives up, or is cancelled.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use creatorhub_core::types::id::UserId;
use creatorhub_core::{AppError, AppResult, ErrorKind};
use creatorhub_entity::notification::SubscriptionPreference;
use creatorhub_entity::presence::PresenceStatus;
use creatorhub_protocol::serializer::{decode_server, encode_client};
use creatorhub_protocol::{ClientMessage, PresenceUpdate, RoomKey, ServerMessage};

use crate::events::{ClientEvent, EventRegistry};
use crate::notifier::Notifier;
use crate::state::{Backoff, ConnectionState, ConnectionStateMachine};

/// Operations buffered between the facade and the driver task.
const OUTBOUND_BUFFER: usize = 128;

/// State shared between the facade and the driver task.
pub(crate) struct Shared {
    machine: Mutex<ConnectionStateMachine>,
    outbound: Mutex<Option<mpsc::Sender<ClientMessage>>>,
    rooms: Mutex<BTreeSet<RoomKey>>,
    preference: Mutex<Option<SubscriptionPreference>>,
    presence: Mutex<Option<PresenceStatus>>,
    user_id: Mutex<Option<UserId>>,
    /// Set by `disconnect`; nothing is dispatched locally while set.
    closed: AtomicBool,
    pub(crate) events: EventRegistry,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("state", &self.state())
            .field("rooms", &self.rooms().len())
            .field("notifier", &self.notifier)
            .finish()
    }
}

impl Shared {
    pub(crate) fn new(machine: ConnectionStateMachine, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            machine: Mutex::new(machine),
            outbound: Mutex::new(None),
            rooms: Mutex::new(BTreeSet::new()),
            preference: Mutex::new(None),
            presence: Mutex::new(None),
            user_id: Mutex::new(None),
            closed: AtomicBool::new(true),
            events: EventRegistry::new(),
            notifier,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.machine
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .state()
    }

    /// Apply a state machine transition and announce a state change.
    pub(crate) fn transition<R>(&self, f: impl FnOnce(&mut ConnectionStateMachine) -> R) -> R {
        let (before, after, result) = {
            let mut machine = self.machine.lock().unwrap_or_else(|e| e.into_inner());
            let before = machine.state();
            let result = f(&mut machine);
            (before, machine.state(), result)
        };
        if before != after {
            debug!(from = %before, to = %after, "Connection state changed");
            self.emit(ClientEvent::StateChanged(after));
        }
        result
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        if !self.closed.load(Ordering::Acquire) {
            self.events.emit(&event);
        }
    }

    pub(crate) fn open_gate(&self) {
        self.closed.store(false, Ordering::Release);
    }

    pub(crate) fn close_gate(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Queue an operation. A no-op unless the channel is connected.
    pub(crate) fn send(&self, msg: ClientMessage) -> bool {
        if !self.state().is_connected() {
            debug!(event = msg.event_name(), "Not connected, dropping operation");
            return false;
        }
        let outbound = self
            .outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(tx) = outbound else {
            return false;
        };
        match tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!(event = msg.event_name(), "Outbound queue full, dropping operation");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    fn set_outbound(&self, tx: Option<mpsc::Sender<ClientMessage>>) {
        *self.outbound.lock().unwrap_or_else(|e| e.into_inner()) = tx;
    }

    pub(crate) fn rooms(&self) -> Vec<RoomKey> {
        self.rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub(crate) fn presence(&self) -> Option<PresenceStatus> {
        *self.presence.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_presence(&self, status: Option<PresenceStatus>) {
        *self.presence.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub(crate) fn user_id(&self) -> Option<UserId> {
        *self.user_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Forget everything tied to the previous session.
    pub(crate) fn reset_session(&self) {
        self.rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        *self.preference.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.user_id.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.set_presence(None);
    }

    pub(crate) fn clear_rooms(&self) {
        self.rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// How a single transport session ended.
#[derive(Debug)]
enum SessionEnd {
    Cancelled,
    Rejected,
    Lost(Option<String>),
}

/// Driver for one `connect` call.
pub(crate) struct Channel {
    endpoint: String,
    credential: String,
    connect_timeout: Duration,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Channel {
    pub(crate) fn new(
        endpoint: String,
        credential: String,
        connect_timeout: Duration,
        shared: Arc<Shared>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint,
            credential,
            connect_timeout,
            shared,
            cancel,
        }
    }

    /// Run sessions until cancelled, rejected, or out of attempts.
    pub(crate) async fn run(self) {
        loop {
            let end = self.session().await;
            self.shared.set_outbound(None);

            let reason = match end {
                SessionEnd::Cancelled => return,
                SessionEnd::Rejected => {
                    info!(endpoint = %self.endpoint, "Credential rejected by relay");
                    self.shared.transition(|m| m.auth_rejected());
                    return;
                }
                SessionEnd::Lost(reason) => reason,
            };

            if let Some(message) = &reason {
                self.shared.emit(ClientEvent::TransportError {
                    message: message.clone(),
                });
            }
            self.shared.emit(ClientEvent::Disconnected { reason });

            match self.shared.transition(|m| m.connection_lost()) {
                Backoff::Retry { attempt, delay } => {
                    info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Reconnecting to relay"
                    );
                    self.shared
                        .emit(ClientEvent::Reconnecting { attempt, delay });
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Backoff::GiveUp { attempts } => {
                    warn!(attempts, "Giving up on relay connection");
                    self.shared
                        .emit(ClientEvent::MaxReconnectAttemptsReached { attempts });
                    return;
                }
            }
        }
    }

    async fn session(&self) -> SessionEnd {
        let connect = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(self.endpoint.as_str()),
        );
        let ws = tokio::select! {
            _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
            result = connect => match result {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => return SessionEnd::Lost(Some(format!("Connect failed: {e}"))),
                Err(_) => {
                    return SessionEnd::Lost(Some(format!(
                        "Connect timed out after {}ms",
                        self.connect_timeout.as_millis()
                    )));
                }
            },
        };

        debug!(endpoint = %self.endpoint, "Transport open, authenticating");
        let (mut sink, mut stream) = ws.split();
        self.shared.transition(|m| m.transport_opened());

        let authenticate = ClientMessage::Authenticate {
            token: self.credential.clone(),
        };
        if let Err(e) = send_frame(&mut sink, &authenticate).await {
            return SessionEnd::Lost(Some(e.message));
        }

        let (tx, mut rx) = mpsc::channel(OUTBOUND_BUFFER);
        let mut pending_tx = Some(tx);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Cancelled;
                }

                Some(msg) = rx.recv() => {
                    if let Err(e) = send_frame(&mut sink, &msg).await {
                        return SessionEnd::Lost(Some(e.message));
                    }
                }

                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => match decode_server(text.as_str()) {
                        Ok(msg) => {
                            if !self.on_server(msg, &mut pending_tx) {
                                let _ = sink.send(Message::Close(None)).await;
                                return SessionEnd::Rejected;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Undecodable frame from relay");
                            self.shared.emit(ClientEvent::TransportError { message: e.message });
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost(None),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Lost(Some(e.to_string())),
                },
            }
        }
    }

    /// Track session state carried by a push and re-publish it. Returns
    /// false when the relay rejected the credential.
    fn on_server(
        &self,
        msg: ServerMessage,
        pending_tx: &mut Option<mpsc::Sender<ClientMessage>>,
    ) -> bool {
        match &msg {
            ServerMessage::Authenticated { user_id, .. } => {
                *self.shared.user_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(*user_id);
                let previous = self.shared.presence();
                self.shared.set_presence(Some(PresenceStatus::Online));
                if let Some(tx) = pending_tx.take() {
                    self.shared.set_outbound(Some(tx));
                }
                self.shared.transition(|m| m.authenticated());
                info!(user_id = %user_id, "Authenticated with relay");
                self.shared.emit(ClientEvent::Server(msg));
                self.restore_session(previous);
                return true;
            }
            ServerMessage::AuthError { reason } => {
                warn!(reason = %reason, "Relay rejected credential");
                self.shared.emit(ClientEvent::Server(msg));
                return false;
            }
            ServerMessage::Notification(notification) => {
                self.shared.notifier.notify(notification);
            }
            ServerMessage::RoomJoined { room, .. } => {
                if let Ok(key) = RoomKey::parse(room) {
                    self.shared
                        .rooms
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(key);
                }
            }
            ServerMessage::RoomLeft { room } => {
                if let Ok(key) = RoomKey::parse(room) {
                    self.shared
                        .rooms
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .remove(&key);
                }
            }
            ServerMessage::NotificationPreferences(preference) => {
                *self.shared.preference.lock().unwrap_or_else(|e| e.into_inner()) =
                    preference.clone();
            }
            _ => {}
        }
        self.shared.emit(ClientEvent::Server(msg));
        true
    }

    /// After a reconnect, put back what the relay dropped with the old
    /// connection: room memberships, the notification preference, and a
    /// non-online presence status.
    fn restore_session(&self, previous_presence: Option<PresenceStatus>) {
        let preference = self
            .shared
            .preference
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(preference) = preference {
            self.shared
                .send(ClientMessage::SubscribeNotifications(preference));
        }

        let rooms = self.shared.rooms();
        if !rooms.is_empty() {
            debug!(count = rooms.len(), "Rejoining rooms");
        }
        for room in rooms {
            self.shared.send(ClientMessage::JoinRoom {
                room: room.to_room_name(),
            });
        }

        if let Some(status @ (PresenceStatus::Away | PresenceStatus::Busy)) = previous_presence {
            let update = ClientMessage::UpdatePresence(PresenceUpdate::status(status));
            if self.shared.send(update) {
                self.shared.set_presence(Some(status));
            }
        }
    }
}

async fn send_frame<S>(sink: &mut S, msg: &ClientMessage) -> AppResult<()>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = encode_client(msg)?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Transport, format!("Send failed: {e}"), e))
}
