//! Notification dispatcher: retains producer notifications and pushes
//! them to the target user's subscribed connections.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use creatorhub_core::AppResult;
use creatorhub_core::types::id::{NotificationId, UserId};
use creatorhub_entity::notification::{
    NewNotification, Notification, NotificationStats, SubscriptionPreference,
};
use creatorhub_protocol::ServerMessage;

use crate::connection::handle::ConnectionHandle;
use crate::connection::pool::ConnectionPool;
use crate::metrics::RealtimeMetrics;

use super::persistence::NotificationArchive;
use super::store::{MarkReadOutcome, NotificationStore};

/// Dispatches notifications to connected users and keeps the retained set
/// used for stats.
#[derive(Debug)]
pub struct NotificationDispatcher {
    /// Retained notifications
    store: NotificationStore,
    /// Live connections
    pool: Arc<ConnectionPool>,
    /// Archive collaborator
    archive: Arc<dyn NotificationArchive>,
    /// Metrics
    metrics: Arc<RealtimeMetrics>,
    /// In-flight archive writes, drained on engine shutdown
    tasks: TaskTracker,
}

impl NotificationDispatcher {
    /// Create a new dispatcher
    pub fn new(
        max_stored_per_user: usize,
        pool: Arc<ConnectionPool>,
        archive: Arc<dyn NotificationArchive>,
        metrics: Arc<RealtimeMetrics>,
        tasks: TaskTracker,
    ) -> Self {
        Self {
            store: NotificationStore::new(max_stored_per_user),
            pool,
            archive,
            metrics,
            tasks,
        }
    }

    /// Accept a notification from a producer.
    ///
    /// The notification is retained for the target user whether or not
    /// they are connected. Each of the user's connections whose
    /// preference accepts the type receives it live, or at the next flush
    /// when it asked for batched delivery.
    pub fn dispatch(&self, new: NewNotification) -> Notification {
        let notification = new.into_notification();
        let user_id = notification.user_id;

        self.store.append_with(notification.clone(), |stored| {
            for conn in self.pool.user_connections(&user_id) {
                self.deliver(&conn, stored);
            }
        });
        self.metrics.notification_dispatched();

        debug!(
            user_id = %user_id,
            notification_id = %notification.id,
            kind = %notification.kind,
            "Notification dispatched"
        );

        self.spawn_archive(notification.clone());
        notification
    }

    fn deliver(&self, conn: &ConnectionHandle, notification: &Notification) {
        let Some(preference) = conn.preference() else {
            return;
        };
        if !preference.accepts(notification.kind) {
            return;
        }
        if preference.is_batched() {
            conn.queue_batched(notification.clone());
            self.metrics.notification_batched();
        } else {
            let sent = conn.send(ServerMessage::Notification(notification.clone()));
            self.metrics.record_send(sent);
            if sent {
                self.metrics.notification_pushed();
            }
        }
    }

    fn spawn_archive(&self, notification: Notification) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let archive = Arc::clone(&self.archive);
        self.tasks.spawn_on(
            async move {
                if let Err(e) = archive.archive(&notification).await {
                    error!(
                        notification_id = %notification.id,
                        error = %e,
                        "Failed to archive notification"
                    );
                }
            },
            &runtime,
        );
    }

    /// Replace a connection's preference. Switching away from batched
    /// delivery flushes what was pending first.
    pub fn subscribe(&self, conn: &ConnectionHandle, preference: SubscriptionPreference) {
        let batched = preference.is_batched();
        conn.set_preference(Some(preference));
        if !batched {
            self.flush_connection(conn);
        }
    }

    /// Clear a connection's preference and discard its pending batch.
    pub fn unsubscribe(&self, conn: &ConnectionHandle) {
        conn.set_preference(None);
        conn.take_pending();
    }

    /// Mark a notification read for its owner.
    pub fn mark_read(&self, user_id: &UserId, id: &NotificationId) -> AppResult<MarkReadOutcome> {
        self.store.mark_read(user_id, id)
    }

    /// Stats over the user's retained notifications.
    pub fn stats(&self, user_id: &UserId) -> NotificationStats {
        self.store.stats(user_id)
    }

    /// Push every connection's pending batch. Returns the number pushed.
    pub fn flush_batches(&self) -> usize {
        self.pool
            .all_connections()
            .iter()
            .map(|conn| self.flush_connection(conn))
            .sum()
    }

    fn flush_connection(&self, conn: &ConnectionHandle) -> usize {
        let mut pushed = 0;
        for notification in conn.take_pending() {
            let sent = conn.send(ServerMessage::Notification(notification));
            self.metrics.record_send(sent);
            if sent {
                self.metrics.notification_pushed();
                pushed += 1;
            }
        }
        pushed
    }

    /// Run the periodic batch flush until `cancel` fires.
    pub fn spawn_batch_flusher(
        self: &Arc<Self>,
        tasks: &TaskTracker,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let dispatcher = Arc::clone(self);
        tasks.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let pushed = dispatcher.flush_batches();
                        if pushed > 0 {
                            debug!(pushed, "Flushed batched notifications");
                        }
                    }
                }
            }
        });
    }
}
