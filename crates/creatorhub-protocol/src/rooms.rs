//! Typed room identifiers and parsing.

use std::fmt;
use std::str::FromStr;

use creatorhub_core::AppError;
use creatorhub_core::AppResult;

use crate::validator::validate_room_id;

/// A fan-out room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomKey {
    /// Live counters for a post.
    Post(String),
    /// Viewers, live chat and gifts for a stream.
    Stream(String),
    /// Direct messages and typing indicators.
    Chat(String),
}

impl RoomKey {
    /// Build a post room after validating the id.
    pub fn post(id: impl Into<String>) -> AppResult<Self> {
        let id = id.into();
        validate_room_id(&id)?;
        Ok(Self::Post(id))
    }

    /// Build a stream room after validating the id.
    pub fn stream(id: impl Into<String>) -> AppResult<Self> {
        let id = id.into();
        validate_room_id(&id)?;
        Ok(Self::Stream(id))
    }

    /// Build a chat room after validating the id.
    pub fn chat(id: impl Into<String>) -> AppResult<Self> {
        let id = id.into();
        validate_room_id(&id)?;
        Ok(Self::Chat(id))
    }

    /// Parse a full room name such as `stream:42`.
    pub fn parse(name: &str) -> AppResult<Self> {
        match name.split_once(':') {
            Some(("post", id)) => Self::post(id),
            Some(("stream", id)) => Self::stream(id),
            Some(("chat", id)) => Self::chat(id),
            _ => Err(AppError::validation(format!("Unknown room '{name}'"))),
        }
    }

    /// The id part after the prefix.
    pub fn id(&self) -> &str {
        match self {
            Self::Post(id) | Self::Stream(id) | Self::Chat(id) => id,
        }
    }

    /// Check if this is a stream room.
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// The full room name.
    pub fn to_room_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post:{id}"),
            Self::Stream(id) => write!(f, "stream:{id}"),
            Self::Chat(id) => write!(f, "chat:{id}"),
        }
    }
}

impl FromStr for RoomKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
