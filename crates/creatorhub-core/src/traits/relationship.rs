//! Relationship-graph collaborator: who cares about whose presence.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;

/// A set of users, or everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every connected user.
    Everyone,
    /// Exactly these users.
    Users(HashSet<UserId>),
}

impl Audience {
    /// Whether `user_id` is part of the audience.
    pub fn contains(&self, user_id: &UserId) -> bool {
        match self {
            Self::Everyone => true,
            Self::Users(users) => users.contains(user_id),
        }
    }

    /// An audience with nobody in it.
    pub fn nobody() -> Self {
        Self::Users(HashSet::new())
    }
}

/// Relationship lookup used to scope presence broadcasts and queries.
#[async_trait]
pub trait RelationshipGraph: Send + Sync + std::fmt::Debug + 'static {
    /// Users who should receive presence changes of `user_id`.
    async fn watchers_of(&self, user_id: UserId) -> AppResult<Audience>;

    /// Users whose presence `viewer` is allowed to see.
    async fn visible_to(&self, viewer: UserId) -> AppResult<Audience>;
}
