//! Top-level relay engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use creatorhub_core::config::RealtimeConfig;
use creatorhub_core::traits::{CredentialVerifier, RelationshipGraph};

use crate::connection::authenticator::ConnectionAuthenticator;
use crate::connection::manager::ConnectionManager;
use crate::connection::pool::ConnectionPool;
use crate::metrics::RealtimeMetrics;
use crate::notification::dispatcher::NotificationDispatcher;
use crate::notification::persistence::{NoopArchive, NotificationArchive};
use crate::presence::relationship::InMemoryRelationshipGraph;
use crate::presence::tracker::PresenceTracker;
use crate::room::registry::RoomRegistry;

/// Central relay engine that coordinates all subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Room registry.
    pub rooms: Arc<RoomRegistry>,
    /// Notification dispatcher.
    pub notifications: Arc<NotificationDispatcher>,
    /// Presence tracker.
    pub presence: Arc<PresenceTracker>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Relay configuration.
    config: RealtimeConfig,
    /// Shutdown signal, parent of every connection token.
    shutdown: CancellationToken,
    /// Background tasks.
    tasks: TaskTracker,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.connections.connection_count())
            .field("rooms", &self.rooms.room_count())
            .finish()
    }
}

/// Builder for [`RealtimeEngine`].
#[derive(Debug)]
pub struct RealtimeEngineBuilder {
    config: RealtimeConfig,
    verifier: Arc<dyn CredentialVerifier>,
    graph: Option<Arc<dyn RelationshipGraph>>,
    archive: Arc<dyn NotificationArchive>,
}

impl RealtimeEngineBuilder {
    /// Use a specific relationship graph instead of the in-memory one.
    pub fn graph(mut self, graph: Arc<dyn RelationshipGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Use a notification archive instead of [`NoopArchive`].
    pub fn archive(mut self, archive: Arc<dyn NotificationArchive>) -> Self {
        self.archive = archive;
        self
    }

    /// Assemble the engine. Background tasks start with [`RealtimeEngine::start`].
    pub fn build(self) -> RealtimeEngine {
        let config = self.config;
        let graph = self.graph.unwrap_or_else(|| {
            if config.presence.open_graph {
                Arc::new(InMemoryRelationshipGraph::open())
            } else {
                Arc::new(InMemoryRelationshipGraph::closed())
            }
        });

        let shutdown = CancellationToken::new();
        let tasks = TaskTracker::new();
        let metrics = Arc::new(RealtimeMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let rooms = Arc::new(RoomRegistry::new());
        let presence = Arc::new(PresenceTracker::new(
            config.presence.clone(),
            graph,
            pool.clone(),
        ));
        let notifications = Arc::new(NotificationDispatcher::new(
            config.notifications.max_stored_per_user,
            pool.clone(),
            self.archive,
            metrics.clone(),
            tasks.clone(),
        ));
        let authenticator = ConnectionAuthenticator::new(self.verifier, config.max_message_size);
        let connections = Arc::new(ConnectionManager::new(
            config.clone(),
            pool,
            rooms.clone(),
            presence.clone(),
            notifications.clone(),
            authenticator,
            metrics.clone(),
            shutdown.clone(),
        ));

        info!("Relay engine initialized");

        RealtimeEngine {
            connections,
            rooms,
            notifications,
            presence,
            metrics,
            config,
            shutdown,
            tasks,
        }
    }
}

impl RealtimeEngine {
    /// Start building an engine.
    pub fn builder(
        config: RealtimeConfig,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> RealtimeEngineBuilder {
        RealtimeEngineBuilder {
            config,
            verifier,
            graph: None,
            archive: Arc::new(NoopArchive),
        }
    }

    /// Spawn background tasks (the batch flusher). Requires a Tokio runtime.
    pub fn start(&self) {
        let interval = Duration::from_millis(self.config.notifications.batch_flush_interval_ms.max(1));
        self.notifications
            .spawn_batch_flusher(&self.tasks, interval, self.shutdown.child_token());
        info!(batch_flush_ms = interval.as_millis() as u64, "Relay engine started");
    }

    /// Relay configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Token cancelled when the engine shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Initiates a graceful shutdown of the relay engine.
    pub async fn shutdown(&self) {
        info!("Shutting down relay engine");

        self.shutdown.cancel();
        self.connections.close_all();
        self.presence.shutdown();

        self.tasks.close();
        self.tasks.wait().await;

        info!("Relay engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use creatorhub_core::traits::VerifiedIdentity;
    use creatorhub_core::types::id::{NotificationId, UserId};
    use creatorhub_core::{AppError, AppResult};
    use creatorhub_entity::notification::{NewNotification, Notification, NotificationType};
    use creatorhub_protocol::ServerMessage;
    use tokio::sync::mpsc;

    use crate::connection::handle::ConnectionHandle;

    #[derive(Debug)]
    struct UuidTokens;

    #[async_trait]
    impl CredentialVerifier for UuidTokens {
        async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity> {
            let user_id = credential
                .parse()
                .map_err(|_| AppError::authentication("Unknown token"))?;
            Ok(VerifiedIdentity {
                user_id,
                display_name: None,
            })
        }
    }

    fn engine(config: RealtimeConfig) -> RealtimeEngine {
        RealtimeEngine::builder(config, Arc::new(UuidTokens)).build()
    }

    async fn connect(
        engine: &RealtimeEngine,
        user: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerMessage>) {
        let frame = format!(r#"{{"event":"authenticate","data":{{"token":"{user}"}}}}"#);
        let identity = engine.connections.authenticate(&frame).await.unwrap();
        engine.connections.register(identity).await
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn names(msgs: &[ServerMessage]) -> Vec<&'static str> {
        msgs.iter().map(|m| m.event_name()).collect()
    }

    #[tokio::test]
    async fn test_register_sends_authenticated_then_stats() {
        let engine = engine(RealtimeConfig::default());
        let (_conn, mut rx) = connect(&engine, UserId::new()).await;
        let msgs = drain(&mut rx);
        assert_eq!(names(&msgs)[..2], ["authenticated", "notification_stats"]);
        match &msgs[0] {
            ServerMessage::Authenticated { features, .. } => {
                assert!(features.iter().any(|f| f == "presence"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gift_reaches_members_only() {
        let engine = engine(RealtimeConfig::default());
        let (a, mut a_rx) = connect(&engine, UserId::new()).await;
        let (b, mut b_rx) = connect(&engine, UserId::new()).await;
        let (_c, mut c_rx) = connect(&engine, UserId::new()).await;

        let join = r#"{"event":"join_room","data":{"room":"stream:42"}}"#;
        engine.connections.handle_inbound(&a, join).await;
        engine.connections.handle_inbound(&b, join).await;
        drain(&mut a_rx);
        drain(&mut b_rx);
        drain(&mut c_rx);

        let gift = r#"{"event":"send_stream_gift","data":{"streamId":"42","giftType":"rose","amount":5}}"#;
        engine.connections.handle_inbound(&a, gift).await;

        let received = drain(&mut b_rx);
        match received.as_slice() {
            [ServerMessage::StreamGift(g)] => {
                assert_eq!(g.gift_type, "rose");
                assert_eq!(g.amount, 5);
                assert_eq!(g.sender_id, a.user_id);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(drain(&mut c_rx).is_empty());
    }

    #[tokio::test]
    async fn test_typing_excludes_sender() {
        let engine = engine(RealtimeConfig::default());
        let (a, mut a_rx) = connect(&engine, UserId::new()).await;
        let (b, mut b_rx) = connect(&engine, UserId::new()).await;
        for conn in [&a, &b] {
            engine
                .connections
                .handle_inbound(conn, r#"{"event":"join_chat_session","data":{"chatId":"c1"}}"#)
                .await;
        }
        drain(&mut a_rx);
        drain(&mut b_rx);

        engine
            .connections
            .handle_inbound(&a, r#"{"event":"typing_start","data":{"chatId":"c1"}}"#)
            .await;
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(names(&drain(&mut b_rx)), ["user_typing"]);
    }

    #[tokio::test]
    async fn test_stream_join_cap() {
        let config = RealtimeConfig {
            max_stream_joins_per_connection: 1,
            ..RealtimeConfig::default()
        };
        let engine = engine(config);
        let (a, mut rx) = connect(&engine, UserId::new()).await;
        drain(&mut rx);

        engine
            .connections
            .handle_inbound(&a, r#"{"event":"join_stream","data":{"streamId":"1"}}"#)
            .await;
        engine
            .connections
            .handle_inbound(&a, r#"{"event":"join_stream","data":{"streamId":"2"}}"#)
            .await;

        let msgs = drain(&mut rx);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Error { code, .. } if code == "CAPACITY"
        )));
        assert_eq!(engine.rooms.stream_count_for(a.id), 1);
    }

    #[tokio::test]
    async fn test_invalid_room_is_validation_error() {
        let engine = engine(RealtimeConfig::default());
        let (a, mut rx) = connect(&engine, UserId::new()).await;
        drain(&mut rx);
        engine
            .connections
            .handle_inbound(&a, r#"{"event":"join_room","data":{"room":"lobby"}}"#)
            .await;
        match drain(&mut rx).as_slice() {
            [ServerMessage::Error { code, .. }] => assert_eq!(code, "VALIDATION"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(a.is_alive());
    }

    #[tokio::test]
    async fn test_unregister_leaves_rooms_and_updates_viewers() {
        let engine = engine(RealtimeConfig::default());
        let (a, _a_rx) = connect(&engine, UserId::new()).await;
        let (b, mut b_rx) = connect(&engine, UserId::new()).await;
        let join = r#"{"event":"join_stream","data":{"streamId":"9"}}"#;
        engine.connections.handle_inbound(&a, join).await;
        engine.connections.handle_inbound(&b, join).await;
        drain(&mut b_rx);

        engine.connections.unregister(&a);
        engine.connections.unregister(&a);

        let key = creatorhub_protocol::RoomKey::parse("stream:9").unwrap();
        assert_eq!(engine.rooms.member_count(&key), 1);
        assert!(drain(&mut b_rx).iter().any(|m| matches!(
            m,
            ServerMessage::ViewerCountUpdate { viewers: 1, .. }
        )));
        assert_eq!(engine.metrics.snapshot().connections_active, 1);
    }

    #[tokio::test]
    async fn test_connection_cap_evicts_oldest() {
        let config = RealtimeConfig {
            max_connections_per_user: 1,
            ..RealtimeConfig::default()
        };
        let engine = engine(config);
        let user = UserId::new();
        let (old, mut old_rx) = connect(&engine, user).await;
        let (_new, _new_rx) = connect(&engine, user).await;

        assert!(old.cancel_token().is_cancelled());
        assert!(drain(&mut old_rx).iter().any(|m| matches!(
            m,
            ServerMessage::Error { code, .. } if code == "CAPACITY"
        )));
        assert_eq!(engine.connections.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_syncs_devices() {
        let engine = engine(RealtimeConfig::default());
        let user = UserId::new();
        let (a, mut a_rx) = connect(&engine, user).await;
        let (_b, mut b_rx) = connect(&engine, user).await;
        let n = engine
            .notifications
            .dispatch(NewNotification::new(user, NotificationType::Like, "l", "m"));
        drain(&mut a_rx);
        drain(&mut b_rx);

        let frame = format!(
            r#"{{"event":"mark_notification_read","data":{{"notificationId":"{}"}}}}"#,
            n.id
        );
        engine.connections.handle_inbound(&a, &frame).await;
        engine.connections.handle_inbound(&a, &frame).await;

        // The repeat is a no-op, so only the caller hears about it.
        assert_eq!(read_acks(&mut a_rx), vec![0, 0]);
        assert_eq!(read_acks(&mut b_rx), vec![0]);
    }

    fn read_acks(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<u64> {
        drain(rx)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::NotificationRead { unread, .. } => Some(unread),
                _ => None,
            })
            .collect()
    }

    #[derive(Debug, Default)]
    struct SlowArchive {
        archived: std::sync::Mutex<Vec<NotificationId>>,
    }

    #[async_trait]
    impl NotificationArchive for SlowArchive {
        async fn archive(&self, notification: &Notification) -> AppResult<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.archived.lock().unwrap().push(notification.id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_archive_writes() {
        let archive = Arc::new(SlowArchive::default());
        let engine = RealtimeEngine::builder(RealtimeConfig::default(), Arc::new(UuidTokens))
            .archive(archive.clone())
            .build();
        engine.start();

        let user = UserId::new();
        let n = engine
            .notifications
            .dispatch(NewNotification::new(user, NotificationType::Comment, "c", "m"));
        assert!(archive.archived.lock().unwrap().is_empty());

        engine.shutdown().await;
        assert_eq!(*archive.archived.lock().unwrap(), vec![n.id]);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_connections() {
        let engine = engine(RealtimeConfig::default());
        engine.start();
        let (a, _rx) = connect(&engine, UserId::new()).await;
        engine.shutdown().await;
        assert!(a.cancel_token().is_cancelled());
    }
}
