//! Presence records and activity events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use creatorhub_core::types::id::UserId;

use super::status::PresenceStatus;

/// Current presence of one user, the union over all their connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// The user.
    pub user_id: UserId,
    /// Availability.
    pub status: PresenceStatus,
    /// Last time the record changed or the user was seen.
    pub last_seen: DateTime<Utc>,
    /// Free-form activity label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    /// Client-supplied location hint. Advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Client-supplied device hint. Advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl PresenceRecord {
    /// A fresh `online` record.
    pub fn online(user_id: UserId) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Online,
            last_seen: Utc::now(),
            activity: None,
            location: None,
            device: None,
        }
    }

    /// The activity event describing this record.
    pub fn to_event(&self) -> ActivityEvent {
        ActivityEvent {
            user_id: self.user_id,
            status: self.status,
            activity: self.activity.clone(),
            timestamp: self.last_seen,
        }
    }
}

/// One entry of the presence/activity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    /// Whose presence changed.
    pub user_id: UserId,
    /// Status after the change.
    pub status: PresenceStatus,
    /// Activity label after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    /// When the change was applied.
    pub timestamp: DateTime<Utc>,
}
