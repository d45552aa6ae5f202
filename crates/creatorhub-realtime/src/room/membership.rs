//! Reverse index: which rooms each connection belongs to.

use std::collections::HashSet;

use dashmap::DashMap;

use creatorhub_core::types::id::ConnectionId;
use creatorhub_protocol::RoomKey;

/// Tracks connection-to-room mappings.
#[derive(Debug)]
pub struct MembershipTracker {
    /// Connection ID → set of rooms.
    conn_to_rooms: DashMap<ConnectionId, HashSet<RoomKey>>,
}

impl MembershipTracker {
    /// Creates a new membership tracker.
    pub fn new() -> Self {
        Self {
            conn_to_rooms: DashMap::new(),
        }
    }

    /// Records a membership.
    pub fn add(&self, conn_id: ConnectionId, room: RoomKey) {
        self.conn_to_rooms.entry(conn_id).or_default().insert(room);
    }

    /// Removes a membership.
    pub fn remove(&self, conn_id: ConnectionId, room: &RoomKey) {
        if let Some(mut rooms) = self.conn_to_rooms.get_mut(&conn_id) {
            rooms.remove(room);
            if rooms.is_empty() {
                drop(rooms);
                self.conn_to_rooms
                    .remove_if(&conn_id, |_, rooms| rooms.is_empty());
            }
        }
    }

    /// Whether a connection is in a room.
    pub fn contains(&self, conn_id: ConnectionId, room: &RoomKey) -> bool {
        self.conn_to_rooms
            .get(&conn_id)
            .is_some_and(|rooms| rooms.contains(room))
    }

    /// Returns the number of rooms a connection is in.
    pub fn count(&self, conn_id: ConnectionId) -> usize {
        self.conn_to_rooms
            .get(&conn_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Returns the number of stream rooms a connection is in.
    pub fn stream_count(&self, conn_id: ConnectionId) -> usize {
        self.conn_to_rooms
            .get(&conn_id)
            .map(|entry| entry.value().iter().filter(|r| r.is_stream()).count())
            .unwrap_or(0)
    }

    /// Removes all memberships for a connection.
    pub fn remove_all(&self, conn_id: ConnectionId) -> HashSet<RoomKey> {
        self.conn_to_rooms
            .remove(&conn_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default()
    }
}

impl Default for MembershipTracker {
    fn default() -> Self {
        Self::new()
    }
}
