//! Single room with member tracking.

use std::collections::HashSet;

use creatorhub_core::types::id::ConnectionId;
use creatorhub_protocol::RoomKey;

/// A fan-out group and its member connections.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room key.
    pub key: RoomKey,
    /// Member connection IDs.
    pub members: HashSet<ConnectionId>,
}

impl Room {
    /// Creates a new empty room.
    pub fn new(key: RoomKey) -> Self {
        Self {
            key,
            members: HashSet::new(),
        }
    }

    /// Adds a member. Returns `false` if it was already present.
    pub fn join(&mut self, conn_id: ConnectionId) -> bool {
        self.members.insert(conn_id)
    }

    /// Removes a member. Returns `false` if it was not present.
    pub fn leave(&mut self, conn_id: ConnectionId) -> bool {
        self.members.remove(&conn_id)
    }

    /// Returns member count.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the room has any members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns all member connection IDs.
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.members.iter().copied().collect()
    }
}
