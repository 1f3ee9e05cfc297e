//! Image library API endpoints (admin)
//!
//! - GET /api/images?bucket=&prefix= - List objects with public URLs
//! - POST /api/images - Multipart upload (`bucket`, `file`, optional `prefix`)
//! - DELETE /api/images - JSON `{bucket, paths}`

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::notify_saved;
use crate::api::middleware::{ApiError, AppState};
use crate::api::upload::UploadForm;
use crate::services::{ImageObject, RemoveImagesInput};

#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    pub bucket: String,
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemovedImagesResponse {
    pub removed: Vec<String>,
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route(
        "/images",
        get(list_images).post(upload_image).delete(remove_images),
    )
}

async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<Vec<ImageObject>>, ApiError> {
    let images = state
        .image_service
        .list(&query.bucket, query.prefix.as_deref())
        .await?;
    Ok(Json(images))
}

async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImageObject>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let bucket = form.require_field("bucket")?.to_string();
    let prefix = form.field("prefix").map(str::to_string);
    let file = form.require_file()?;

    let image = state
        .image_service
        .upload(&bucket, prefix.as_deref(), &file.filename, &file.data, &file.content_type)
        .await?;
    notify_saved(&state, format!("Uploaded {}", file.filename)).await;
    Ok((StatusCode::CREATED, Json(image)))
}

async fn remove_images(
    State(state): State<AppState>,
    Json(body): Json<RemoveImagesInput>,
) -> Result<Json<RemovedImagesResponse>, ApiError> {
    let removed = state.image_service.remove(&body).await?;
    notify_saved(&state, format!("Removed {} image(s)", removed.len())).await;
    Ok(Json(RemovedImagesResponse { removed }))
}
