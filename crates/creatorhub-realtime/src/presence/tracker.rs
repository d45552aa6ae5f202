//! Presence tracker: per-user status, debounced offline transitions, and
//! broadcast of changes to interested connections.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::AbortHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use creatorhub_core::config::PresenceConfig;
use creatorhub_core::traits::{Audience, RelationshipGraph};
use creatorhub_core::types::id::UserId;
use creatorhub_core::{AppError, AppResult};
use creatorhub_entity::presence::{ActivityEvent, PresenceRecord, PresenceStatus};
use creatorhub_protocol::{PresenceUpdate, ServerMessage};

use crate::connection::pool::ConnectionPool;

use super::history::ActivityHistory;

/// Default number of entries returned by a history query without a limit.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Longest accepted activity, location, or device label.
const MAX_LABEL_LEN: usize = 256;

/// Tracks presence state for all users.
///
/// Every state change is applied and enqueued to observers while the
/// user's record is locked, so observers receive one user's updates in the
/// order they were applied.
#[derive(Debug)]
pub struct PresenceTracker {
    /// User ID → current record
    records: DashMap<UserId, PresenceRecord>,
    /// User ID → scheduled offline demotion
    pending_offline: DashMap<UserId, AbortHandle>,
    /// Recent changes
    history: ActivityHistory,
    /// Who watches whom
    graph: Arc<dyn RelationshipGraph>,
    /// Live connections, for delivery and idle checks
    pool: Arc<ConnectionPool>,
    /// Settings
    config: PresenceConfig,
    /// Demotion tasks
    tasks: TaskTracker,
}

impl PresenceTracker {
    /// Create a new presence tracker
    pub fn new(
        config: PresenceConfig,
        graph: Arc<dyn RelationshipGraph>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            records: DashMap::new(),
            pending_offline: DashMap::new(),
            history: ActivityHistory::new(config.activity_history_size),
            graph,
            pool,
            config,
            tasks: TaskTracker::new(),
        }
    }

    /// A user's connection authenticated.
    ///
    /// Cancels any pending offline demotion. A user who was offline (or
    /// unknown) becomes `online` and watchers are told; a user who is
    /// already online, away, or busy keeps their status.
    pub async fn connected(&self, user_id: UserId) {
        if let Some((_, pending)) = self.pending_offline.remove(&user_id) {
            pending.abort();
            debug!(user_id = %user_id, "Offline demotion cancelled by reconnect");
        }

        let audience = self.watchers(user_id).await;

        let mut record = self
            .records
            .entry(user_id)
            .or_insert_with(|| PresenceRecord {
                status: PresenceStatus::Offline,
                ..PresenceRecord::online(user_id)
            });
        record.last_seen = Utc::now();
        if record.status.is_online() {
            return;
        }
        record.status = PresenceStatus::Online;
        record.activity = None;
        let snapshot = record.clone();
        self.publish(&audience, snapshot);
    }

    /// A user's last connection closed. Schedules the offline transition
    /// after the grace period; a reconnect in the meantime cancels it.
    pub fn disconnected(self: &Arc<Self>, user_id: UserId) {
        let tracker = Arc::clone(self);
        let grace = Duration::from_millis(self.config.offline_grace_ms);
        let task = self.tasks.spawn(async move {
            tokio::time::sleep(grace).await;
            tracker.demote_if_idle(user_id).await;
            // A later disconnect may have replaced this entry; only clear our own.
            let own = tokio::task::id();
            tracker
                .pending_offline
                .remove_if(&user_id, |_, pending| pending.id() == own);
        });
        let own = task.id();
        if let Some(previous) = self.pending_offline.insert(user_id, task.abort_handle()) {
            previous.abort();
        }
        if task.is_finished() {
            self.pending_offline
                .remove_if(&user_id, |_, pending| pending.id() == own);
        }
        debug!(user_id = %user_id, grace_ms = self.config.offline_grace_ms, "Offline demotion scheduled");
    }

    async fn demote_if_idle(&self, user_id: UserId) {
        let audience = self.watchers(user_id).await;
        {
            let Some(mut record) = self.records.get_mut(&user_id) else {
                return;
            };
            if self.pool.has_user(&user_id) || record.status == PresenceStatus::Offline {
                return;
            }
            record.status = PresenceStatus::Offline;
            record.activity = None;
            record.last_seen = Utc::now();
            let snapshot = record.clone();
            self.publish(&audience, snapshot);
        }
        debug!(user_id = %user_id, "User demoted to offline");
    }

    /// Apply an explicit presence update from the user.
    pub async fn update(&self, user_id: UserId, update: PresenceUpdate) -> AppResult<PresenceRecord> {
        for label in [&update.activity, &update.location, &update.device]
            .into_iter()
            .flatten()
        {
            if label.chars().count() > MAX_LABEL_LEN {
                return Err(AppError::validation(format!(
                    "Presence labels are limited to {MAX_LABEL_LEN} characters"
                )));
            }
        }

        let audience = self.watchers(user_id).await;

        let mut record = self
            .records
            .entry(user_id)
            .or_insert_with(|| PresenceRecord::online(user_id));
        record.status = update.status;
        record.activity = update.activity;
        record.location = update.location;
        record.device = update.device;
        record.last_seen = Utc::now();
        let snapshot = record.clone();
        self.publish(&audience, snapshot.clone());
        drop(record);

        debug!(user_id = %user_id, status = %snapshot.status, "Presence updated");
        Ok(snapshot)
    }

    /// Online users visible to `viewer`, excluding the viewer.
    pub async fn online_visible_to(&self, viewer: UserId) -> AppResult<Vec<PresenceRecord>> {
        let audience = self.graph.visible_to(viewer).await?;
        let mut online: Vec<PresenceRecord> = self
            .records
            .iter()
            .filter(|r| {
                r.status.is_online() && r.user_id != viewer && audience.contains(&r.user_id)
            })
            .map(|r| r.value().clone())
            .collect();
        online.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(online)
    }

    /// Recent activity in `viewer`'s network, newest first.
    pub async fn activity_history(
        &self,
        viewer: UserId,
        limit: Option<usize>,
    ) -> AppResult<Vec<ActivityEvent>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(self.config.max_history_limit);
        let audience = self.graph.visible_to(viewer).await?;
        Ok(self
            .history
            .recent(limit, |e| e.user_id == viewer || audience.contains(&e.user_id)))
    }

    /// Current status for a user.
    pub fn status(&self, user_id: &UserId) -> PresenceStatus {
        self.records
            .get(user_id)
            .map(|r| r.status)
            .unwrap_or(PresenceStatus::Offline)
    }

    /// Number of users not reported offline.
    pub fn online_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_online()).count()
    }

    /// Cancel all pending demotions.
    pub fn shutdown(&self) {
        for entry in self.pending_offline.iter() {
            entry.value().abort();
        }
        self.pending_offline.clear();
        self.tasks.close();
    }

    async fn watchers(&self, user_id: UserId) -> Audience {
        match self.graph.watchers_of(user_id).await {
            Ok(audience) => audience,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Relationship lookup failed");
                Audience::nobody()
            }
        }
    }

    /// Record the change and enqueue it to every watching connection.
    /// Called with the user's record locked.
    fn publish(&self, audience: &Audience, record: PresenceRecord) {
        self.history.record(record.to_event());
        let msg = ServerMessage::PresenceUpdate(record);
        let targets = match audience {
            Audience::Everyone => self.pool.all_connections(),
            Audience::Users(users) => users
                .iter()
                .flat_map(|u| self.pool.user_connections(u))
                .collect(),
        };
        for conn in targets {
            conn.send(msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::handle::ConnectionHandle;
    use crate::presence::relationship::InMemoryRelationshipGraph;
    use creatorhub_core::traits::VerifiedIdentity;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        tracker: Arc<PresenceTracker>,
        pool: Arc<ConnectionPool>,
    }

    fn fixture(graph: InMemoryRelationshipGraph) -> Fixture {
        let pool = Arc::new(ConnectionPool::new());
        let tracker = Arc::new(PresenceTracker::new(
            PresenceConfig::default(),
            Arc::new(graph),
            pool.clone(),
        ));
        Fixture { tracker, pool }
    }

    fn connect(
        pool: &ConnectionPool,
        user_id: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(32);
        let identity = VerifiedIdentity {
            user_id,
            display_name: None,
        };
        let handle = Arc::new(ConnectionHandle::new(identity, tx, CancellationToken::new()));
        pool.add(handle.clone());
        (handle, rx)
    }

    fn statuses(rx: &mut mpsc::Receiver<ServerMessage>, user: UserId) -> Vec<PresenceStatus> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::PresenceUpdate(record) = msg {
                if record.user_id == user {
                    out.push(record.status);
                }
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_after_grace() {
        let f = fixture(InMemoryRelationshipGraph::open());
        let (a, b) = (UserId::new(), UserId::new());
        let (_obs, mut observer) = connect(&f.pool, b);

        let (conn, _rx) = connect(&f.pool, a);
        f.tracker.connected(a).await;
        assert_eq!(statuses(&mut observer, a), vec![PresenceStatus::Online]);

        f.pool.remove(&conn.id);
        f.tracker.disconnected(a);

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert!(statuses(&mut observer, a).is_empty());
        assert_eq!(f.tracker.status(&a), PresenceStatus::Online);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(statuses(&mut observer, a), vec![PresenceStatus::Offline]);
        assert_eq!(f.tracker.status(&a), PresenceStatus::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_demotion_clears_pending_entry() {
        let f = fixture(InMemoryRelationshipGraph::open());
        let a = UserId::new();

        let (first, _rx1) = connect(&f.pool, a);
        let (second, _rx2) = connect(&f.pool, a);
        f.tracker.connected(a).await;

        // Another connection is still open, so the demotion is skipped.
        f.pool.remove(&first.id);
        f.tracker.disconnected(a);
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(f.tracker.status(&a), PresenceStatus::Online);
        assert!(f.tracker.pending_offline.is_empty());

        f.pool.remove(&second.id);
        f.tracker.disconnected(a);
        assert_eq!(f.tracker.pending_offline.len(), 1);
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(f.tracker.status(&a), PresenceStatus::Offline);
        assert!(f.tracker.pending_offline.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_demotion_keeps_newer_entry() {
        let f = fixture(InMemoryRelationshipGraph::open());
        let a = UserId::new();

        let (conn, _rx) = connect(&f.pool, a);
        f.tracker.connected(a).await;
        f.pool.remove(&conn.id);

        f.tracker.disconnected(a);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        f.tracker.disconnected(a);
        let newer = f
            .tracker
            .pending_offline
            .get(&a)
            .map(|pending| pending.id());

        // The first timer would have fired here; the newer one is still pending.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(f.tracker.status(&a), PresenceStatus::Online);
        assert_eq!(
            f.tracker.pending_offline.get(&a).map(|pending| pending.id()),
            newer
        );

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(f.tracker.status(&a), PresenceStatus::Offline);
        assert!(f.tracker.pending_offline.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_within_grace_does_not_flap() {
        let f = fixture(InMemoryRelationshipGraph::open());
        let (a, b) = (UserId::new(), UserId::new());
        let (_obs, mut observer) = connect(&f.pool, b);

        let (conn, _rx) = connect(&f.pool, a);
        f.tracker.connected(a).await;
        f.pool.remove(&conn.id);
        f.tracker.disconnected(a);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        let (_conn2, _rx2) = connect(&f.pool, a);
        f.tracker.connected(a).await;

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(statuses(&mut observer, a), vec![PresenceStatus::Online]);
        assert_eq!(f.tracker.status(&a), PresenceStatus::Online);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let f = fixture(InMemoryRelationshipGraph::open());
        let (a, b) = (UserId::new(), UserId::new());
        let (_obs, mut observer) = connect(&f.pool, b);
        f.tracker.connected(a).await;

        f.tracker
            .update(a, PresenceUpdate::status(PresenceStatus::Away))
            .await
            .unwrap();
        f.tracker
            .update(a, PresenceUpdate::status(PresenceStatus::Busy))
            .await
            .unwrap();

        let seen = statuses(&mut observer, a);
        assert_eq!(seen.last(), Some(&PresenceStatus::Busy));
        assert_eq!(f.tracker.status(&a), PresenceStatus::Busy);
    }

    #[tokio::test]
    async fn test_closed_graph_scopes_broadcast_and_queries() {
        let graph = InMemoryRelationshipGraph::closed();
        let (a, friend, stranger) = (UserId::new(), UserId::new(), UserId::new());
        graph.follow(friend, a);
        let f = fixture(graph);
        let (_f, mut friend_rx) = connect(&f.pool, friend);
        let (_s, mut stranger_rx) = connect(&f.pool, stranger);

        let (_a, _a_rx) = connect(&f.pool, a);
        f.tracker.connected(a).await;
        assert_eq!(statuses(&mut friend_rx, a), vec![PresenceStatus::Online]);
        assert!(statuses(&mut stranger_rx, a).is_empty());

        let visible = f.tracker.online_visible_to(friend).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].user_id, a);
        assert!(f.tracker.online_visible_to(stranger).await.unwrap().is_empty());

        let history = f.tracker.activity_history(friend, Some(10)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(f.tracker.activity_history(stranger, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_limit_is_clamped() {
        let f = fixture(InMemoryRelationshipGraph::open());
        let a = UserId::new();
        for _ in 0..150 {
            f.tracker
                .update(a, PresenceUpdate::status(PresenceStatus::Away))
                .await
                .unwrap();
        }
        let history = f.tracker.activity_history(a, Some(1_000)).await.unwrap();
        assert_eq!(history.len(), PresenceConfig::default().max_history_limit);
    }

    #[tokio::test]
    async fn test_rejects_oversized_label() {
        let f = fixture(InMemoryRelationshipGraph::open());
        let mut update = PresenceUpdate::status(PresenceStatus::Online);
        update.activity = Some("x".repeat(MAX_LABEL_LEN + 1));
        assert!(f.tracker.update(UserId::new(), update).await.is_err());
    }
}
