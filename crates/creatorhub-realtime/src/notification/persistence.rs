//! Archive seam for notification history beyond the relay's retention.

use async_trait::async_trait;

use creatorhub_core::AppResult;
use creatorhub_entity::notification::Notification;

/// Receives every accepted notification. Failures are logged by the
/// dispatcher and never affect live delivery.
#[async_trait]
pub trait NotificationArchive: Send + Sync + std::fmt::Debug + 'static {
    /// Persist one notification.
    async fn archive(&self, notification: &Notification) -> AppResult<()>;
}

/// Archive that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopArchive;

#[async_trait]
impl NotificationArchive for NoopArchive {
    async fn archive(&self, _notification: &Notification) -> AppResult<()> {
        Ok(())
    }
}
