//! Producer intake: server-side producers hand notifications to the relay.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use creatorhub_core::AppError;
use creatorhub_entity::notification::{NewNotification, Notification};
use tracing::{debug, warn};

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared producer secret.
pub const PRODUCER_KEY_HEADER: &str = "x-producer-key";

/// POST /api/notifications
pub async fn publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewNotification>,
) -> Result<(StatusCode, Json<ApiResponse<Notification>>), ApiError> {
    let Some(expected) = state.engine.config().producer_key.as_deref() else {
        return Err(AppError::authorization("Producer intake is disabled").into());
    };

    let presented = headers
        .get(PRODUCER_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        warn!("Producer intake refused: bad key");
        return Err(AppError::authorization("Invalid producer key").into());
    }

    if body.title.trim().is_empty() {
        return Err(AppError::validation("Notification title must not be empty").into());
    }

    let notification = state.engine.notifications.dispatch(body);
    debug!(
        notification_id = %notification.id,
        user_id = %notification.user_id,
        kind = notification.kind.as_str(),
        "Producer notification accepted"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(notification))))
}
