//! Room registry: rooms are created on first join and dropped when the
//! last member leaves.

use dashmap::DashMap;

use creatorhub_core::types::id::ConnectionId;
use creatorhub_protocol::RoomKey;

use super::membership::MembershipTracker;
use super::room::Room;

/// Registry of all live rooms.
#[derive(Debug)]
pub struct RoomRegistry {
    /// Room key → room.
    rooms: DashMap<RoomKey, Room>,
    /// Reverse index for disconnect cleanup.
    memberships: MembershipTracker,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            memberships: MembershipTracker::new(),
        }
    }

    /// Adds a connection to a room, creating it if absent. Returns the
    /// member count after the join.
    pub fn join(&self, key: &RoomKey, conn_id: ConnectionId) -> usize {
        let count = {
            let mut room = self
                .rooms
                .entry(key.clone())
                .or_insert_with(|| Room::new(key.clone()));
            room.join(conn_id);
            room.member_count()
        };
        self.memberships.add(conn_id, key.clone());
        count
    }

    /// Removes a connection from a room, dropping the room when empty.
    /// Returns the remaining member count, or `None` if the connection was
    /// not a member.
    pub fn leave(&self, key: &RoomKey, conn_id: ConnectionId) -> Option<usize> {
        self.memberships.remove(conn_id, key);
        self.remove_member(key, conn_id)
    }

    /// Removes a connection from every room it joined. Returns each room
    /// left together with its remaining member count.
    pub fn leave_all(&self, conn_id: ConnectionId) -> Vec<(RoomKey, usize)> {
        self.memberships
            .remove_all(conn_id)
            .into_iter()
            .filter_map(|key| {
                let remaining = self.remove_member(&key, conn_id)?;
                Some((key, remaining))
            })
            .collect()
    }

    fn remove_member(&self, key: &RoomKey, conn_id: ConnectionId) -> Option<usize> {
        let mut room = self.rooms.get_mut(key)?;
        if !room.leave(conn_id) {
            return None;
        }
        let remaining = room.member_count();
        drop(room);
        if remaining == 0 {
            self.rooms.remove_if(key, |_, room| room.is_empty());
        }
        Some(remaining)
    }

    /// Current member connection IDs of a room.
    pub fn members(&self, key: &RoomKey) -> Vec<ConnectionId> {
        self.rooms
            .get(key)
            .map(|room| room.member_ids())
            .unwrap_or_default()
    }

    /// Member count of a room (0 when it does not exist).
    pub fn member_count(&self, key: &RoomKey) -> usize {
        self.rooms
            .get(key)
            .map(|room| room.member_count())
            .unwrap_or(0)
    }

    /// Whether the room currently exists.
    pub fn exists(&self, key: &RoomKey) -> bool {
        self.rooms.contains_key(key)
    }

    /// Whether a connection is a member of a room.
    pub fn is_member(&self, key: &RoomKey, conn_id: ConnectionId) -> bool {
        self.memberships.contains(conn_id, key)
    }

    /// Number of rooms a connection is in.
    pub fn room_count_for(&self, conn_id: ConnectionId) -> usize {
        self.memberships.count(conn_id)
    }

    /// Number of stream rooms a connection is in.
    pub fn stream_count_for(&self, conn_id: ConnectionId) -> usize {
        self.memberships.stream_count(conn_id)
    }

    /// Total number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
