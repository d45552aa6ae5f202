//! Bounded ring buffer of presence/activity events.

use std::collections::VecDeque;
use std::sync::Mutex;

use creatorhub_entity::presence::ActivityEvent;

/// Keeps the most recent activity events, oldest evicted first.
#[derive(Debug)]
pub struct ActivityHistory {
    events: Mutex<VecDeque<ActivityEvent>>,
    capacity: usize,
}

impl ActivityHistory {
    /// Create a history holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Append an event.
    pub fn record(&self, event: ActivityEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Up to `limit` events accepted by `filter`, newest first.
    pub fn recent<F>(&self, limit: usize, filter: F) -> Vec<ActivityEvent>
    where
        F: Fn(&ActivityEvent) -> bool,
    {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events
            .iter()
            .rev()
            .filter(|e| filter(e))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
