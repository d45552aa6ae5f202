//! Room fan-out groups and membership tracking.

pub mod membership;
pub mod registry;
pub mod room;

pub use registry::RoomRegistry;
pub use room::Room;
