//! # creatorhub-protocol
//!
//! The closed set of messages exchanged over a relay connection. Both the
//! server and the client depend on this crate, so a misspelled event name
//! is a compile error rather than a silently dropped frame.
//!
//! Every frame is one JSON object `{"event": "<name>", "data": <payload>}`.

pub mod builder;
pub mod rooms;
pub mod serializer;
pub mod types;
pub mod validator;

pub use rooms::RoomKey;
pub use types::{
    ChatMessage, ClientMessage, GiftEvent, PresenceUpdate, ServerMessage, StreamChat,
};
