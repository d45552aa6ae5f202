//! Presence domain entities.

pub mod model;
pub mod status;

pub use model::{ActivityEvent, PresenceRecord};
pub use status::PresenceStatus;
