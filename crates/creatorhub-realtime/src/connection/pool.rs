//! Connection pool: tracks all active connections indexed by user ID.

use std::sync::Arc;

use dashmap::DashMap;

use creatorhub_core::types::id::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active relay connections.
#[derive(Debug)]
pub struct ConnectionPool {
    /// User ID → connection handles, oldest first.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self {
            by_user: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle.clone());
        self.by_user.entry(handle.user_id).or_default().push(handle);
    }

    /// Adds a connection and evicts the user's oldest connections so that
    /// at most `max_per_user` remain. Returns the evicted handles.
    pub fn add_capped(
        &self,
        handle: Arc<ConnectionHandle>,
        max_per_user: usize,
    ) -> Vec<Arc<ConnectionHandle>> {
        let mut evicted = Vec::new();
        {
            let mut connections = self.by_user.entry(handle.user_id).or_default();
            connections.push(handle.clone());
            let max = max_per_user.max(1);
            if connections.len() > max {
                let excess = connections.len() - max;
                evicted.extend(connections.drain(..excess));
            }
        }
        self.by_id.insert(handle.id, handle);
        for old in &evicted {
            self.by_id.remove(&old.id);
        }
        evicted
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(mut connections) = self.by_user.get_mut(&handle.user_id) {
            connections.retain(|c| c.id != *conn_id);
            if connections.is_empty() {
                drop(connections);
                self.by_user
                    .remove_if(&handle.user_id, |_, conns| conns.is_empty());
            }
        }
        Some(handle)
    }

    /// Gets all connections for a user.
    pub fn user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Checks whether a user has at least one connection.
    pub fn has_user(&self, user_id: &UserId) -> bool {
        self.by_user
            .get(user_id)
            .is_some_and(|entry| !entry.value().is_empty())
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}
