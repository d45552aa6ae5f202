//! In-process relationship graph.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use creatorhub_core::AppResult;
use creatorhub_core::traits::{Audience, RelationshipGraph};
use creatorhub_core::types::id::UserId;

/// Directed follow edges held in memory.
///
/// In open mode every user watches every other user and the edges are
/// ignored.
#[derive(Debug, Default)]
pub struct InMemoryRelationshipGraph {
    open: bool,
    /// Follower → users they follow.
    following: DashMap<UserId, HashSet<UserId>>,
}

impl InMemoryRelationshipGraph {
    /// A graph in which everybody watches everybody.
    pub fn open() -> Self {
        Self {
            open: true,
            following: DashMap::new(),
        }
    }

    /// A graph driven only by explicit follow edges.
    pub fn closed() -> Self {
        Self::default()
    }

    /// `follower` starts watching `followee`.
    pub fn follow(&self, follower: UserId, followee: UserId) {
        self.following.entry(follower).or_default().insert(followee);
    }

    /// `follower` stops watching `followee`.
    pub fn unfollow(&self, follower: UserId, followee: UserId) {
        if let Some(mut set) = self.following.get_mut(&follower) {
            set.remove(&followee);
        }
    }
}

#[async_trait]
impl RelationshipGraph for InMemoryRelationshipGraph {
    async fn watchers_of(&self, user_id: UserId) -> AppResult<Audience> {
        if self.open {
            return Ok(Audience::Everyone);
        }
        let watchers = self
            .following
            .iter()
            .filter(|entry| entry.value().contains(&user_id))
            .map(|entry| *entry.key())
            .collect();
        Ok(Audience::Users(watchers))
    }

    async fn visible_to(&self, viewer: UserId) -> AppResult<Audience> {
        if self.open {
            return Ok(Audience::Everyone);
        }
        Ok(Audience::Users(
            self.following
                .get(&viewer)
                .map(|set| set.clone())
                .unwrap_or_default(),
        ))
    }
}
