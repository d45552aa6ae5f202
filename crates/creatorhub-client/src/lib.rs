//! # creatorhub-client
//!
//! Application-facing side of the CreatorHub relay.
//!
//! - [`RelayClient`] wraps one WebSocket channel and exposes every relay
//!   operation as a typed method
//! - [`state`] holds the connection state machine and the reconnect
//!   backoff policy, testable without a network
//! - [`events`] re-publishes server pushes and connection lifecycle
//!   changes to locally registered handlers
//! - [`notifier`] is the optional hook for surfacing notifications to the
//!   user outside the application

pub mod channel;
pub mod events;
pub mod facade;
pub mod notifier;
pub mod state;

pub use events::{ClientEvent, EventKind, EventRegistry, Handler};
pub use facade::RelayClient;
pub use notifier::{LogNotifier, NoopNotifier, Notifier};
pub use state::{Backoff, ConnectionState, ConnectionStateMachine, ReconnectPolicy};
