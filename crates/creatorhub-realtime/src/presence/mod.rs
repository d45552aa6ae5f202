//! Presence tracking, activity history, and the relationship graph.

pub mod history;
pub mod relationship;
pub mod tracker;

pub use history::ActivityHistory;
pub use relationship::InMemoryRelationshipGraph;
pub use tracker::PresenceTracker;
