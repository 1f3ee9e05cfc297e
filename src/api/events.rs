//! Event API endpoints
//!
//! Public:
//! - GET /api/events - Published events (`category`, `upcoming`, paging)
//! - GET /api/events/{id_or_slug} - Published event
//! - GET /api/events/{id}/images - Gallery
//! - GET /api/events/{id}/related - Events in the same category
//! - GET /api/events/categories - Categories
//!
//! Admin:
//! - GET /api/admin/events - All events including drafts
//! - GET /api/admin/events/{id} - Any event
//! - POST /api/events, PUT|DELETE /api/events/{id}
//! - POST /api/events/{id}/images - Multipart upload or JSON image slot
//! - DELETE /api/events/{id}/images/{image_id}
//! - POST /api/events/categories, DELETE /api/events/categories/{id}

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page, notify_saved, PaginationQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::api::upload::UploadForm;
use crate::models::{
    EventCategory, EventCategoryInput, EventImageInput, EventImageView, EventInput, EventView,
    ListParams, PagedResult,
};
use crate::services::event::EVENTS_BUCKET;
use crate::services::EventQuery;

/// Query parameters for the public event list
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// Category slug
    pub category: Option<String>,
    #[serde(default)]
    pub upcoming: bool,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<i64>,
}

/// Build public event routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/categories", get(list_categories))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/images", get(list_images))
        .route("/events/{id}/related", get(related_events))
}

/// Build admin event routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/events", get(list_all_events))
        .route("/admin/events/{id}", get(get_any_event))
        .route("/events", post(create_event))
        .route("/events/{id}", axum::routing::put(update_event).delete(delete_event))
        .route("/events/{id}/images", post(add_image))
        .route("/events/{id}/images/{image_id}", delete(remove_image))
        .route("/events/categories", post(create_category))
        .route("/events/categories/{id}", delete(delete_category))
}

/// GET /api/events
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<PagedResult<EventView>>, ApiError> {
    let filter = EventQuery {
        category: query.category.filter(|c| !c.trim().is_empty()),
        upcoming: query.upcoming,
    };
    let params = ListParams::new(query.page, query.per_page);
    let events = state.event_service.list_published(&filter, &params).await?;
    Ok(Json(events))
}

/// GET /api/events/{id_or_slug}
async fn get_event(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<EventView>, ApiError> {
    Ok(Json(state.event_service.get(&id_or_slug, false).await?))
}

/// GET /api/events/{id}/images
async fn list_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<EventImageView>>, ApiError> {
    Ok(Json(state.event_service.list_images(id).await?))
}

/// GET /api/events/{id}/related
async fn related_events(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<RelatedQuery>,
) -> Result<Json<Vec<EventView>>, ApiError> {
    Ok(Json(state.event_service.related(id, query.limit).await?))
}

/// GET /api/events/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventCategory>>, ApiError> {
    Ok(Json(state.event_service.list_categories().await?))
}

/// GET /api/admin/events
async fn list_all_events(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<EventView>>, ApiError> {
    Ok(Json(state.event_service.list_admin(&query.params()).await?))
}

/// GET /api/admin/events/{id}
async fn get_any_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EventView>, ApiError> {
    Ok(Json(state.event_service.get(&id.to_string(), true).await?))
}

/// POST /api/events
async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<EventInput>,
) -> Result<(StatusCode, Json<EventView>), ApiError> {
    let event = state.event_service.create(body).await?;
    notify_saved(&state, format!("Event \"{}\" created", event.event.title)).await;
    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /api/events/{id}
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EventInput>,
) -> Result<Json<EventView>, ApiError> {
    let event = state.event_service.update(id, body).await?;
    notify_saved(&state, format!("Event \"{}\" saved", event.event.title)).await;
    Ok(Json(event))
}

/// DELETE /api/events/{id}
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.event_service.delete(id).await?;
    notify_saved(&state, "Event deleted").await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/events/{id}/images
///
/// Takes either a multipart form (`file`, optional `caption`) or a JSON
/// body with an image slot.
async fn add_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<(StatusCode, Json<EventImageView>), ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let input = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::validation_error(e.body_text()))?;
        let mut form = UploadForm::read(multipart).await?;
        let file = form.require_file()?;
        let pending = state
            .staging
            .stage(EVENTS_BUCKET, &file.filename, &file.content_type, file.data)
            .await?;
        EventImageInput {
            image: pending.slot(),
            caption: form.field("caption").map(str::to_string),
        }
    } else {
        let Json(input) = Json::<EventImageInput>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::validation_error(e.body_text()))?;
        input
    };

    let image = state.event_service.add_image(id, input).await?;
    notify_saved(&state, "Image added to gallery").await;
    Ok((StatusCode::CREATED, Json(image)))
}

/// DELETE /api/events/{id}/images/{image_id}
async fn remove_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.event_service.remove_image(id, image_id).await?;
    notify_saved(&state, "Image removed from gallery").await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/events/categories
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<EventCategoryInput>,
) -> Result<(StatusCode, Json<EventCategory>), ApiError> {
    let category = state.event_service.create_category(body).await?;
    notify_saved(&state, format!("Category \"{}\" created", category.name)).await;
    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /api/events/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.event_service.delete_category(id).await?;
    notify_saved(&state, "Category deleted").await;
    Ok(StatusCode::NO_CONTENT)
}
