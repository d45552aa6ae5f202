//! Individual relay connection handle.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use creatorhub_core::traits::VerifiedIdentity;
use creatorhub_core::types::id::{ConnectionId, UserId};
use creatorhub_entity::notification::{Notification, SubscriptionPreference};
use creatorhub_protocol::ServerMessage;

/// A handle to a single authenticated connection.
///
/// Holds the sender for pushing messages to the socket task, the
/// connection's notification preference, and its liveness state. A
/// handle only exists once the credential exchange has succeeded.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Display name from the credential, if any
    pub display_name: Option<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound messages
    sender: mpsc::Sender<ServerMessage>,
    /// Notification filter; `None` means no live pushes
    preference: Mutex<Option<SubscriptionPreference>>,
    /// Notifications held for the next batch flush
    pending: Mutex<Vec<Notification>>,
    /// Last pong received
    last_pong: Mutex<Instant>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Cancelled when the connection must close
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        identity: VerifiedIdentity,
        sender: mpsc::Sender<ServerMessage>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id: identity.user_id,
            display_name: identity.display_name,
            connected_at: Utc::now(),
            sender,
            preference: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
            last_pong: Mutex::new(Instant::now()),
            alive: AtomicBool::new(true),
            cancel,
        }
    }

    /// Queue an outbound message without waiting.
    ///
    /// Returns `false` if the message was dropped because the connection
    /// is closed or its queue is full.
    pub fn send(&self, msg: ServerMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    event = msg.event_name(),
                    "Send buffer full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark dead and signal the socket task to close.
    pub fn close(&self) {
        self.mark_dead();
        self.cancel.cancel();
    }

    /// Token cancelled when this connection must close.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Record a pong response
    pub fn record_pong(&self) {
        *self.last_pong.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    /// When the last pong arrived.
    pub fn last_pong(&self) -> Instant {
        *self.last_pong.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current notification preference.
    pub fn preference(&self) -> Option<SubscriptionPreference> {
        self.preference
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the notification preference.
    pub fn set_preference(&self, preference: Option<SubscriptionPreference>) {
        *self.preference.lock().unwrap_or_else(|e| e.into_inner()) = preference;
    }

    /// Hold a notification for the next batch flush.
    pub fn queue_batched(&self, notification: Notification) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }

    /// Drain the pending batch in arrival order.
    pub fn take_pending(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Number of notifications awaiting the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(buffer: usize) -> (ConnectionHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        let identity = VerifiedIdentity {
            user_id: UserId::new(),
            display_name: None,
        };
        (ConnectionHandle::new(identity, tx, CancellationToken::new()), rx)
    }

    fn room_left() -> ServerMessage {
        ServerMessage::RoomLeft {
            room: "post:1".into(),
        }
    }

    #[test]
    fn test_send_drops_when_full() {
        let (handle, mut rx) = handle(1);
        assert!(handle.send(room_left()));
        assert!(!handle.send(room_left()));
        assert!(handle.is_alive());
        assert!(rx.try_recv().is_ok());
        assert!(handle.send(room_left()));
    }

    #[test]
    fn test_send_after_receiver_dropped_marks_dead() {
        let (handle, rx) = handle(4);
        drop(rx);
        assert!(!handle.send(room_left()));
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_close_cancels_token() {
        let (handle, _rx) = handle(4);
        handle.close();
        assert!(handle.cancel_token().is_cancelled());
        assert!(!handle.send(room_left()));
    }
}
