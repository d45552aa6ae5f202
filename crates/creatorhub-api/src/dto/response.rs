//! Response DTOs.

use serde::{Deserialize, Serialize};

use creatorhub_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health and relay counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the state was built.
    pub uptime_seconds: u64,
    /// Open relay connections.
    pub connections: usize,
    /// Distinct connected users.
    pub connected_users: usize,
    /// Users whose presence is not offline.
    pub online_users: usize,
    /// Live rooms.
    pub rooms: usize,
    /// Counter snapshot.
    pub metrics: MetricsSnapshot,
}
