//! Company profile API endpoints
//!
//! - GET /api/company-profile
//! - PUT /api/company-profile (admin)

use axum::{extract::State, routing::get, Json, Router};

use crate::api::common::notify_saved;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CompanyProfileInput, CompanyProfileView};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/company-profile", get(get_profile))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/company-profile", axum::routing::put(update_profile))
}

async fn get_profile(State(state): State<AppState>) -> Result<Json<CompanyProfileView>, ApiError> {
    Ok(Json(state.company_profile_service.get().await?))
}

async fn update_profile(
    State(state): State<AppState>,
    Json(body): Json<CompanyProfileInput>,
) -> Result<Json<CompanyProfileView>, ApiError> {
    let profile = state.company_profile_service.update(body).await?;
    notify_saved(&state, "Company profile saved").await;
    Ok(Json(profile))
}
