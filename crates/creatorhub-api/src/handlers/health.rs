//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let engine = &state.engine;

    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        connections: engine.connections.connection_count(),
        connected_users: engine.connections.user_count(),
        online_users: engine.presence.online_count(),
        rooms: engine.rooms.room_count(),
        metrics: engine.metrics.snapshot(),
    }))
}
