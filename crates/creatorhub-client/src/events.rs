//! Local publish/subscribe registry for relay events.
//!
//! Every server push is re-published as [`ClientEvent::Server`]; the
//! channel adds lifecycle events of its own. Handlers are keyed by
//! [`EventKind`], run in registration order, and may be registered before
//! any connection exists.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use creatorhub_protocol::ServerMessage;

use crate::state::ConnectionState;

/// An event observed by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A message pushed by the relay.
    Server(ServerMessage),
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// The transport closed unexpectedly.
    Disconnected {
        /// Transport error text, when there was one.
        reason: Option<String>,
    },
    /// A reconnect attempt is scheduled after `delay`.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Backoff before the attempt.
        delay: Duration,
    },
    /// A transport or protocol error. Not fatal by itself.
    TransportError {
        /// What went wrong.
        message: String,
    },
    /// Reconnection gave up; call `connect` again to resume.
    MaxReconnectAttemptsReached {
        /// Attempts that were made.
        attempts: u32,
    },
}

impl ClientEvent {
    /// The registry key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Server(msg) => EventKind::of(msg),
            Self::StateChanged(_) => EventKind::StateChanged,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::Reconnecting { .. } => EventKind::Reconnecting,
            Self::TransportError { .. } => EventKind::TransportError,
            Self::MaxReconnectAttemptsReached { .. } => EventKind::MaxReconnectAttemptsReached,
        }
    }

    /// The server message, when this is a push.
    pub fn as_server(&self) -> Option<&ServerMessage> {
        match self {
            Self::Server(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Closed set of event names handlers can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Authenticated,
    AuthError,
    Notification,
    NotificationStats,
    NotificationRead,
    NotificationPreferences,
    PresenceUpdate,
    OnlineConnections,
    ActivityHistory,
    RoomJoined,
    RoomLeft,
    NewMessage,
    UserTyping,
    ViewerCountUpdate,
    StreamChatMessage,
    StreamGift,
    PostLikeUpdate,
    Error,
    StateChanged,
    Disconnected,
    Reconnecting,
    TransportError,
    MaxReconnectAttemptsReached,
}

impl EventKind {
    /// Every kind, server pushes first.
    pub const ALL: [EventKind; 23] = [
        Self::Authenticated,
        Self::AuthError,
        Self::Notification,
        Self::NotificationStats,
        Self::NotificationRead,
        Self::NotificationPreferences,
        Self::PresenceUpdate,
        Self::OnlineConnections,
        Self::ActivityHistory,
        Self::RoomJoined,
        Self::RoomLeft,
        Self::NewMessage,
        Self::UserTyping,
        Self::ViewerCountUpdate,
        Self::StreamChatMessage,
        Self::StreamGift,
        Self::PostLikeUpdate,
        Self::Error,
        Self::StateChanged,
        Self::Disconnected,
        Self::Reconnecting,
        Self::TransportError,
        Self::MaxReconnectAttemptsReached,
    ];

    /// Key of a server push.
    pub fn of(msg: &ServerMessage) -> Self {
        match msg {
            ServerMessage::Authenticated { .. } => Self::Authenticated,
            ServerMessage::AuthError { .. } => Self::AuthError,
            ServerMessage::Notification(_) => Self::Notification,
            ServerMessage::NotificationStats(_) => Self::NotificationStats,
            ServerMessage::NotificationRead { .. } => Self::NotificationRead,
            ServerMessage::NotificationPreferences(_) => Self::NotificationPreferences,
            ServerMessage::PresenceUpdate(_) => Self::PresenceUpdate,
            ServerMessage::OnlineConnections(_) => Self::OnlineConnections,
            ServerMessage::ActivityHistory(_) => Self::ActivityHistory,
            ServerMessage::RoomJoined { .. } => Self::RoomJoined,
            ServerMessage::RoomLeft { .. } => Self::RoomLeft,
            ServerMessage::NewMessage(_) => Self::NewMessage,
            ServerMessage::UserTyping { .. } => Self::UserTyping,
            ServerMessage::ViewerCountUpdate { .. } => Self::ViewerCountUpdate,
            ServerMessage::StreamChatMessage(_) => Self::StreamChatMessage,
            ServerMessage::StreamGift(_) => Self::StreamGift,
            ServerMessage::PostLikeUpdate { .. } => Self::PostLikeUpdate,
            ServerMessage::Error { .. } => Self::Error,
        }
    }
}

/// A registered event handler. Keep the returned `Arc` to remove it later.
pub type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Handler registry keyed by [`EventKind`].
#[derive(Default)]
pub struct EventRegistry {
    handlers: Mutex<HashMap<EventKind, Vec<Handler>>>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let total: usize = handlers.values().map(Vec::len).sum();
        f.debug_struct("EventRegistry")
            .field("handlers", &total)
            .finish()
    }
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`.
    pub fn on(&self, kind: EventKind, handler: Handler) {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.entry(kind).or_default().push(handler);
    }

    /// Remove exactly `handler` (by pointer identity). Returns whether it
    /// was registered.
    pub fn off(&self, kind: EventKind, handler: &Handler) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            handlers.remove(&kind);
        }
        true
    }

    /// Invoke every handler for the event's kind, in registration order.
    /// Returns the number of handlers called.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        // Handlers may call on/off themselves.
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
            handlers.get(&event.kind()).cloned().unwrap_or_default()
        };
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.get(&kind).map_or(0, Vec::len)
    }
}
