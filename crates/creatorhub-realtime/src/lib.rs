//! # creatorhub-realtime
//!
//! Server side of the CreatorHub relay. Provides:
//!
//! - Connection registry with per-user caps, heartbeat checks, and an
//!   authentication gate in front of every other operation
//! - Room fan-out for `post:`, `stream:` and `chat:` rooms
//! - Presence tracking with a debounced offline transition and a bounded
//!   activity history
//! - Notification retention, preference filtering, and live or batched
//!   delivery
//!
//! Transport is out of scope here: the API crate owns the sockets and
//! drives a [`ConnectionManager`] with decoded frames.

pub mod connection;
pub mod metrics;
pub mod notification;
pub mod presence;
pub mod room;
pub mod server;

pub use connection::authenticator::ConnectionAuthenticator;
pub use connection::handle::ConnectionHandle;
pub use connection::manager::ConnectionManager;
pub use metrics::RealtimeMetrics;
pub use notification::dispatcher::NotificationDispatcher;
pub use notification::persistence::{NoopArchive, NotificationArchive};
pub use presence::relationship::InMemoryRelationshipGraph;
pub use presence::tracker::PresenceTracker;
pub use room::registry::RoomRegistry;
pub use server::{RealtimeEngine, RealtimeEngineBuilder};
