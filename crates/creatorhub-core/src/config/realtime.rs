//! Real-time relay engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum WebSocket connections per user.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Per-connection outbound queue size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// WebSocket ping timeout in seconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Seconds a fresh socket has to send its credential.
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_seconds: u64,
    /// Maximum rooms a single connection may be a member of.
    #[serde(default = "default_max_rooms")]
    pub max_rooms_per_connection: usize,
    /// Maximum `stream:` rooms a single connection may watch at once.
    #[serde(default = "default_max_streams")]
    pub max_stream_joins_per_connection: usize,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Feature flags advertised in the `authenticated` event.
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    /// Shared secret required by the producer intake endpoint. Intake is
    /// disabled when unset.
    #[serde(default)]
    pub producer_key: Option<String>,
    /// Presence-specific settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Notification-specific settings.
    #[serde(default)]
    pub notifications: NotificationRealtimeConfig,
}

/// Presence tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Delay before a user whose last connection closed is demoted to
    /// offline. A reconnect within this window cancels the demotion.
    #[serde(default = "default_offline_grace")]
    pub offline_grace_ms: u64,
    /// Number of presence/activity events retained for history queries.
    #[serde(default = "default_activity_history")]
    pub activity_history_size: usize,
    /// Upper bound on the `limit` of a history query.
    #[serde(default = "default_max_history_limit")]
    pub max_history_limit: usize,
    /// Whether every user watches every other user's presence. When
    /// false, only explicit relationship edges are used.
    #[serde(default = "default_true")]
    pub open_graph: bool,
}

/// Notification delivery settings for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRealtimeConfig {
    /// Maximum retained notifications per user; the oldest are evicted.
    #[serde(default = "default_max_stored")]
    pub max_stored_per_user: usize,
    /// Flush interval for connections that asked for batched delivery.
    #[serde(default = "default_batch_flush")]
    pub batch_flush_interval_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            auth_timeout_seconds: default_auth_timeout(),
            max_rooms_per_connection: default_max_rooms(),
            max_stream_joins_per_connection: default_max_streams(),
            max_message_size: default_max_message_size(),
            features: default_features(),
            producer_key: None,
            presence: PresenceConfig::default(),
            notifications: NotificationRealtimeConfig::default(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            offline_grace_ms: default_offline_grace(),
            activity_history_size: default_activity_history(),
            max_history_limit: default_max_history_limit(),
            open_graph: true,
        }
    }
}

impl Default for NotificationRealtimeConfig {
    fn default() -> Self {
        Self {
            max_stored_per_user: default_max_stored(),
            batch_flush_interval_ms: default_batch_flush(),
        }
    }
}

impl RealtimeConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Ping timeout as a [`Duration`].
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds)
    }

    /// Authentication timeout as a [`Duration`].
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_seconds)
    }
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    10
}

fn default_auth_timeout() -> u64 {
    10
}

fn default_max_rooms() -> usize {
    50
}

fn default_max_streams() -> usize {
    3
}

fn default_max_message_size() -> usize {
    65_536
}

fn default_features() -> Vec<String> {
    ["notifications", "presence", "rooms", "streams", "chat"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_offline_grace() -> u64 {
    3000
}

fn default_activity_history() -> usize {
    500
}

fn default_max_history_limit() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_max_stored() -> usize {
    200
}

fn default_batch_flush() -> u64 {
    5000
}
