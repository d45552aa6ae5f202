//! Hook for surfacing notifications outside the application (desktop
//! banners, OS toasts). The client works the same with [`NoopNotifier`].

use std::fmt;

use creatorhub_entity::notification::Notification;

/// Receives every live `notification` push before local handlers run.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Surface `notification` to the user.
    fn notify(&self, notification: &Notification);
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) {}
}

/// Notifier that writes each notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(
            notification_id = %notification.id,
            kind = notification.kind.as_str(),
            title = %notification.title,
            "Notification received"
        );
    }
}
