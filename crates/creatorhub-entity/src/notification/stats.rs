//! Aggregate counts over a user's retained notifications.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::kind::NotificationType;
use super::model::Notification;

/// Summary returned by `get_notification_stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    /// Retained notifications.
    pub total: u64,
    /// Retained notifications not yet read.
    pub unread: u64,
    /// Retained notifications per type.
    pub by_type: BTreeMap<NotificationType, u64>,
    /// `read / total * 100`, or 0 when there are none.
    pub read_rate: f64,
}

impl NotificationStats {
    /// Compute stats over a set of notifications.
    pub fn compute<'a>(notifications: impl IntoIterator<Item = &'a Notification>) -> Self {
        let mut stats = Self::default();
        for n in notifications {
            stats.total += 1;
            if n.is_unread() {
                stats.unread += 1;
            }
            *stats.by_type.entry(n.kind).or_insert(0) += 1;
        }
        stats.read_rate = if stats.total == 0 {
            0.0
        } else {
            (stats.total - stats.unread) as f64 / stats.total as f64 * 100.0
        };
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::model::NewNotification;
    use creatorhub_core::types::id::UserId;

    #[test]
    fn test_empty_read_rate_is_zero() {
        let stats = NotificationStats::compute(std::iter::empty());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.read_rate, 0.0);
    }

    #[test]
    fn test_counts_by_type() {
        let user = UserId::new();
        let mut items: Vec<Notification> = [
            NotificationType::Like,
            NotificationType::Like,
            NotificationType::Comment,
            NotificationType::GiftReceived,
        ]
        .into_iter()
        .map(|k| NewNotification::new(user, k, "t", "m").into_notification())
        .collect();
        items[0].mark_read();

        let stats = NotificationStats::compute(&items);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.unread, 3);
        assert_eq!(stats.by_type[&NotificationType::Like], 2);
        assert_eq!(stats.read_rate, 25.0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["byType"]["gift_received"], 1);
        assert_eq!(json["readRate"], 25.0);
    }
}
