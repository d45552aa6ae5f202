//! Notification domain entities.

pub mod kind;
pub mod model;
pub mod preference;
pub mod stats;

pub use kind::NotificationType;
pub use model::{NewNotification, Notification};
pub use preference::{DeliveryChannel, DeliveryFrequency, SubscriptionPreference};
pub use stats::NotificationStats;
