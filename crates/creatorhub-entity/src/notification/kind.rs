//! Notification type enumeration.

use serde::{Deserialize, Serialize};

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Someone liked the recipient's content.
    Like,
    /// Someone commented on the recipient's content.
    Comment,
    /// Someone subscribed to the recipient.
    Subscription,
    /// A direct message arrived.
    Message,
    /// A followed creator went live.
    StreamStart,
    /// The recipient received a gift.
    GiftReceived,
}

impl NotificationType {
    /// All types, in declaration order.
    pub const ALL: [NotificationType; 6] = [
        Self::Like,
        Self::Comment,
        Self::Subscription,
        Self::Message,
        Self::StreamStart,
        Self::GiftReceived,
    ];

    /// Return the type as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Subscription => "subscription",
            Self::Message => "message",
            Self::StreamStart => "stream_start",
            Self::GiftReceived => "gift_received",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = creatorhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                creatorhub_core::AppError::validation(format!("Invalid notification type: '{s}'"))
            })
    }
}
