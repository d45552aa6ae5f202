//! Relay engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Total connections authenticated
    pub connections_total: AtomicU64,
    /// Connections currently registered
    pub connections_active: AtomicU64,
    /// Connections evicted by the per-user cap
    pub connections_evicted: AtomicU64,
    /// Credential exchanges that failed
    pub auth_failures: AtomicU64,
    /// Inbound messages processed
    pub messages_received: AtomicU64,
    /// Outbound messages queued
    pub messages_sent: AtomicU64,
    /// Outbound messages dropped (closed or full queue)
    pub messages_dropped: AtomicU64,
    /// Inbound messages refused with an error event
    pub messages_rejected: AtomicU64,
    /// Notifications accepted from producers
    pub notifications_dispatched: AtomicU64,
    /// Notifications pushed live
    pub notifications_pushed: AtomicU64,
    /// Notifications held for a batch flush
    pub notifications_batched: AtomicU64,
    /// Room joins
    pub room_joins: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection
    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    /// Record an eviction
    pub fn connection_evicted(&self) {
        self.connections_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed credential exchange
    pub fn auth_failed(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound message
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound message refused with an error
    pub fn message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one queued send
    pub fn record_send(&self, delivered: bool) {
        if delivered {
            self.messages_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.messages_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record `count` successful sends
    pub fn messages_sent_count(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an accepted notification
    pub fn notification_dispatched(&self) {
        self.notifications_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a live notification push
    pub fn notification_pushed(&self) {
        self.notifications_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a notification held for batching
    pub fn notification_batched(&self) {
        self.notifications_batched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a room join
    pub fn room_joined(&self) {
        self.room_joins.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_evicted: self.connections_evicted.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            notifications_dispatched: self.notifications_dispatched.load(Ordering::Relaxed),
            notifications_pushed: self.notifications_pushed.load(Ordering::Relaxed),
            notifications_batched: self.notifications_batched.load(Ordering::Relaxed),
            room_joins: self.room_joins.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections authenticated
    pub connections_total: u64,
    /// Connections currently registered
    pub connections_active: u64,
    /// Connections evicted by the per-user cap
    pub connections_evicted: u64,
    /// Failed credential exchanges
    pub auth_failures: u64,
    /// Inbound messages processed
    pub messages_received: u64,
    /// Outbound messages queued
    pub messages_sent: u64,
    /// Outbound messages dropped
    pub messages_dropped: u64,
    /// Inbound messages refused with an error
    pub messages_rejected: u64,
    /// Notifications accepted
    pub notifications_dispatched: u64,
    /// Notifications pushed live
    pub notifications_pushed: u64,
    /// Notifications held for batching
    pub notifications_batched: u64,
    /// Room joins
    pub room_joins: u64,
}
