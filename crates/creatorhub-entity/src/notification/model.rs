//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use creatorhub_core::types::id::{NotificationId, UserId};

use super::kind::NotificationType;

/// An immutable notification record targeted at one user.
///
/// Only the read flag ever changes, and only from unread to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// What happened.
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Recipient.
    pub user_id: UserId,
    /// Related entity (post, stream, chat, ...), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    /// Kind of the related entity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_type: Option<String>,
    /// Free-form producer metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// Whether the recipient has read it.
    #[serde(default)]
    pub is_read: bool,
    /// When it was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

/// Producer input: a notification before the relay assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Recipient.
    pub user_id: UserId,
    /// Related entity id.
    #[serde(default)]
    pub related_id: Option<String>,
    /// Related entity kind.
    #[serde(default)]
    pub related_type: Option<String>,
    /// Free-form producer metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NewNotification {
    /// Start a notification for `user_id`.
    pub fn new(
        user_id: UserId,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            user_id,
            related_id: None,
            related_type: None,
            metadata: None,
        }
    }

    /// Attach the related entity.
    pub fn related(mut self, related_type: impl Into<String>, related_id: impl Into<String>) -> Self {
        self.related_type = Some(related_type.into());
        self.related_id = Some(related_id.into());
        self
    }

    /// Attach producer metadata.
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Assign an id and creation time.
    pub fn into_notification(self) -> Notification {
        Notification {
            id: NotificationId::new(),
            kind: self.kind,
            title: self.title,
            message: self.message,
            user_id: self.user_id,
            related_id: self.related_id,
            related_type: self.related_type,
            metadata: self.metadata,
            created_at: Utc::now(),
            is_read: false,
            read_at: None,
        }
    }
}

impl Notification {
    /// Check if the notification is still unread.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// Mark as read. Returns `false` if it was already read.
    pub fn mark_read(&mut self) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(Utc::now());
        true
    }
}
