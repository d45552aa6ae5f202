//! Notification retention, filtering, and delivery.

pub mod dispatcher;
pub mod persistence;
pub mod store;

pub use dispatcher::NotificationDispatcher;
pub use persistence::{NoopArchive, NotificationArchive};
pub use store::NotificationStore;
