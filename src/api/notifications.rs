//! Admin notification endpoints
//!
//! - GET /api/admin/notifications - Visible notices, oldest first
//! - DELETE /api/admin/notifications/{id} - Dismiss a notice

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::Notice;

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/notifications", get(list_notices))
        .route("/admin/notifications/{id}", delete(dismiss_notice))
}

async fn list_notices(State(state): State<AppState>) -> Json<Vec<Notice>> {
    Json(state.notifications.active().await)
}

async fn dismiss_notice(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    if state.notifications.dismiss(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Notice not found"))
    }
}
