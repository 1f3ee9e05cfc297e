//! Upload API endpoints
//!
//! Multipart form reading shared by the upload handlers, and the staging
//! endpoints used by editor forms:
//! - POST /api/admin/staging - Stage a file, returns a pending token
//! - GET /api/admin/staging/{token} - Preview a staged file
//! - DELETE /api/admin/staging/{token} - Discard a staged file

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::collections::HashMap;

use crate::api::middleware::{ApiError, AppState};
use crate::services::PendingUpload;

/// File part of a multipart form
#[derive(Debug)]
pub struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A multipart form with at most one file field named `file`
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<FilePart>,
}

impl UploadForm {
    /// Read every part of the form
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let content_type = field.content_type().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;
                form.file = Some(FilePart {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            } else if !name.is_empty() {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read field {}: {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Text field value, if present and non-blank
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_field(&self, name: &str) -> Result<&str, ApiError> {
        self.field(name)
            .ok_or_else(|| ApiError::validation_error(format!("Missing field: {}", name)))
    }

    pub fn require_file(&mut self) -> Result<FilePart, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::validation_error("No file uploaded"))
    }
}

/// Build the staging router (admin)
pub fn staging_router() -> Router<AppState> {
    Router::new()
        .route("/admin/staging", post(stage_file))
        .route("/admin/staging/{token}", get(preview_file).delete(discard_file))
}

/// POST /api/admin/staging
///
/// Multipart form with `bucket` and `file`. Nothing is written to storage
/// until the record holding the returned slot is saved.
async fn stage_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PendingUpload>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let bucket = form.require_field("bucket")?.to_string();
    let file = form.require_file()?;

    let pending = state
        .staging
        .stage(&bucket, &file.filename, &file.content_type, file.data)
        .await?;
    Ok((StatusCode::CREATED, Json(pending)))
}

/// GET /api/admin/staging/{token}
async fn preview_file(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let staged = state
        .staging
        .preview(&token)
        .await
        .ok_or_else(|| ApiError::not_found("Staged upload not found"))?;

    Ok((
        [
            (header::CONTENT_TYPE, staged.content_type.clone()),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        Body::from(staged.data.clone()),
    )
        .into_response())
}

/// DELETE /api/admin/staging/{token}
async fn discard_file(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.staging.discard(&token).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Staged upload not found"))
    }
}
