//! Bounded per-user notification retention.

use std::collections::VecDeque;

use dashmap::DashMap;

use creatorhub_core::types::id::{NotificationId, UserId};
use creatorhub_core::{AppError, AppResult};
use creatorhub_entity::notification::{Notification, NotificationStats};

/// Retains the most recent notifications of every user.
#[derive(Debug)]
pub struct NotificationStore {
    /// User ID → notifications, oldest first.
    users: DashMap<UserId, VecDeque<Notification>>,
    /// Retention per user.
    max_per_user: usize,
}

/// Outcome of marking a notification read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkReadOutcome {
    /// Whether the read flag changed.
    pub changed: bool,
    /// Unread count after the call.
    pub unread: u64,
}

impl NotificationStore {
    /// Create a store retaining `max_per_user` notifications per user.
    pub fn new(max_per_user: usize) -> Self {
        Self {
            users: DashMap::new(),
            max_per_user: max_per_user.max(1),
        }
    }

    /// Append a notification, evicting the user's oldest beyond the
    /// retention bound, then run `deliver` while the user's entry is still
    /// locked. Concurrent appends for one user are therefore delivered in
    /// the order they were stored.
    pub fn append_with<F>(&self, notification: Notification, deliver: F)
    where
        F: FnOnce(&Notification),
    {
        let mut items = self.users.entry(notification.user_id).or_default();
        while items.len() >= self.max_per_user {
            items.pop_front();
        }
        items.push_back(notification);
        if let Some(stored) = items.back() {
            deliver(stored);
        }
    }

    /// Mark one of the user's notifications as read. Idempotent.
    pub fn mark_read(&self, user_id: &UserId, id: &NotificationId) -> AppResult<MarkReadOutcome> {
        let mut items = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
        let changed = items
            .iter_mut()
            .find(|n| n.id == *id)
            .map(|n| n.mark_read())
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;
        let unread = items.iter().filter(|n| n.is_unread()).count() as u64;
        Ok(MarkReadOutcome { changed, unread })
    }

    /// Stats over the user's retained notifications.
    pub fn stats(&self, user_id: &UserId) -> NotificationStats {
        self.users
            .get(user_id)
            .map(|items| NotificationStats::compute(items.iter()))
            .unwrap_or_default()
    }

    /// Number of retained notifications for a user.
    pub fn len(&self, user_id: &UserId) -> usize {
        self.users.get(user_id).map(|items| items.len()).unwrap_or(0)
    }
}
