//! Ping/pong heartbeat bookkeeping for connection keepalive.
//!
//! The socket task owns the timer and the ping frames; this module only
//! decides whether a connection has gone quiet for too long.

use std::time::Duration;

use tokio::time::Instant;

use creatorhub_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Extra time a pong may take before the connection is considered dead
    pub ping_timeout: Duration,
}

impl HeartbeatConfig {
    /// Longest tolerated silence since the last pong.
    pub fn deadline(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
        }
    }
}

/// Result of a heartbeat check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    /// Pong seen recently; send the next ping.
    Alive,
    /// No pong within the deadline; close the connection.
    TimedOut,
}

/// Check a connection's last pong against the deadline.
pub fn check(handle: &ConnectionHandle, config: &HeartbeatConfig) -> HeartbeatStatus {
    check_at(handle.last_pong(), Instant::now(), config)
}

fn check_at(last_pong: Instant, now: Instant, config: &HeartbeatConfig) -> HeartbeatStatus {
    if now.saturating_duration_since(last_pong) > config.deadline() {
        HeartbeatStatus::TimedOut
    } else {
        HeartbeatStatus::Alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_is_interval_plus_timeout() {
        let config = HeartbeatConfig {
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(10),
        };
        let start = Instant::now();
        assert_eq!(
            check_at(start, start + Duration::from_secs(40), &config),
            HeartbeatStatus::Alive
        );
        assert_eq!(
            check_at(start, start + Duration::from_secs(41), &config),
            HeartbeatStatus::TimedOut
        );
    }

    #[test]
    fn test_from_realtime_config() {
        let config = HeartbeatConfig::from(&RealtimeConfig::default());
        assert_eq!(config.deadline(), Duration::from_secs(40));
    }
}
