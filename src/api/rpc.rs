//! Named procedure endpoint
//!
//! - GET|POST /api/rpc/{name} - JSON array of rows; unknown names are 404

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::api::middleware::{ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/rpc/{name}", get(call_procedure).post(call_procedure))
}

async fn call_procedure(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(state.rpc_service.call(&name).await?))
}
