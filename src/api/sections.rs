//! Page section API endpoints
//!
//! - GET /api/sections/{key} - Section with its items
//! - PUT /api/sections/{key} - Save a section (admin)

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use crate::api::common::notify_saved;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{SectionInput, SectionKey, SectionView};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/sections/{key}", get(get_section))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/sections/{key}", put(save_section))
}

fn parse_key(key: &str) -> Result<SectionKey, ApiError> {
    key.parse()
        .map_err(|_| ApiError::not_found(format!("Section {} not found", key)))
}

async fn get_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SectionView>, ApiError> {
    let key = parse_key(&key)?;
    Ok(Json(state.section_service.get(key).await?))
}

async fn save_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<SectionInput>,
) -> Result<Json<SectionView>, ApiError> {
    let key = parse_key(&key)?;
    let section = state.section_service.save(key, body).await?;
    notify_saved(&state, "Section saved").await;
    Ok(Json(section))
}
