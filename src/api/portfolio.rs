//! Portfolio API endpoints
//!
//! - GET /api/portfolio - Items in gallery order
//! - POST /api/portfolio - Add an item (admin)
//! - PUT /api/portfolio - Replace the whole list (admin)
//! - PUT|DELETE /api/portfolio/{id} (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::common::notify_saved;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{PortfolioItemInput, PortfolioItemView};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/portfolio", get(list_items))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/portfolio", put(replace_items).post(create_item))
        .route("/portfolio/{id}", put(update_item).delete(delete_item))
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<PortfolioItemView>>, ApiError> {
    Ok(Json(state.portfolio_service.list().await?))
}

async fn create_item(
    State(state): State<AppState>,
    Json(body): Json<PortfolioItemInput>,
) -> Result<(StatusCode, Json<PortfolioItemView>), ApiError> {
    let item = state.portfolio_service.create(body).await?;
    notify_saved(&state, "Portfolio item added").await;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/portfolio
///
/// Body is the full ordered list; list position is the default sort order.
async fn replace_items(
    State(state): State<AppState>,
    Json(body): Json<Vec<PortfolioItemInput>>,
) -> Result<Json<Vec<PortfolioItemView>>, ApiError> {
    let items = state.portfolio_service.replace_all(body).await?;
    notify_saved(&state, format!("Portfolio saved ({} items)", items.len())).await;
    Ok(Json(items))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PortfolioItemInput>,
) -> Result<Json<PortfolioItemView>, ApiError> {
    let item = state.portfolio_service.update(id, body).await?;
    notify_saved(&state, "Portfolio item saved").await;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.portfolio_service.delete(id).await?;
    notify_saved(&state, "Portfolio item deleted").await;
    Ok(StatusCode::NO_CONTENT)
}
