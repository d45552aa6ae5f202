//! Per-connection notification subscription preference.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::kind::NotificationType;

/// How quickly matching notifications are pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFrequency {
    /// Push as soon as the notification is dispatched.
    #[default]
    Instant,
    /// Hold and push on the next periodic flush.
    Batched,
}

/// Delivery channels a subscriber is interested in. Only `Push` (this
/// live connection) is delivered by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    /// The live relay connection.
    Push,
    /// E-mail, handled elsewhere.
    Email,
    /// SMS, handled elsewhere.
    Sms,
}

/// Filter set by `subscribe_notifications`; replaced wholesale by a later
/// call and cleared on disconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPreference {
    /// Types of interest. Empty means every type.
    #[serde(default)]
    pub types: BTreeSet<NotificationType>,
    /// Delivery frequency.
    #[serde(default)]
    pub frequency: DeliveryFrequency,
    /// Channels of interest. Empty means push only.
    #[serde(default)]
    pub channels: BTreeSet<DeliveryChannel>,
}

impl SubscriptionPreference {
    /// Preference that accepts only the given types.
    pub fn only(types: impl IntoIterator<Item = NotificationType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Whether a notification of `kind` should be pushed live.
    pub fn accepts(&self, kind: NotificationType) -> bool {
        self.wants_push() && (self.types.is_empty() || self.types.contains(&kind))
    }

    /// Whether the live channel is among the requested channels.
    pub fn wants_push(&self) -> bool {
        self.channels.is_empty() || self.channels.contains(&DeliveryChannel::Push)
    }

    /// Whether delivery is deferred to the periodic flush.
    pub fn is_batched(&self) -> bool {
        self.frequency == DeliveryFrequency::Batched
    }
}
