//! Blog API endpoints
//!
//! - GET /api/blog/posts - Published posts (paginated)
//! - GET /api/blog/posts/{slug} - Published post
//! - GET /api/admin/blog/posts - All posts (admin)
//! - POST /api/blog/posts, PUT|DELETE /api/blog/posts/{id} (admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{notify_saved, PaginationQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{BlogPostInput, BlogPostView, PagedResult};

/// Build public blog routes
pub fn public_router() -> Router<AppState> {
    // `{id}` is the slug here; the admin routes share the pattern
    Router::new()
        .route("/blog/posts", get(list_posts))
        .route("/blog/posts/{id}", get(get_post))
}

/// Build admin blog routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/blog/posts", get(list_all_posts))
        .route("/blog/posts", post(create_post))
        .route("/blog/posts/{id}", put(update_post).delete(delete_post))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<BlogPostView>>, ApiError> {
    Ok(Json(state.blog_service.list_published(&query.params()).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPostView>, ApiError> {
    Ok(Json(state.blog_service.get_published(&slug).await?))
}

async fn list_all_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<BlogPostView>>, ApiError> {
    Ok(Json(state.blog_service.list_all(&query.params()).await?))
}

async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<BlogPostInput>,
) -> Result<(StatusCode, Json<BlogPostView>), ApiError> {
    let post = state.blog_service.create(body).await?;
    notify_saved(&state, format!("Post \"{}\" created", post.post.title)).await;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<BlogPostInput>,
) -> Result<Json<BlogPostView>, ApiError> {
    let post = state.blog_service.update(id, body).await?;
    notify_saved(&state, format!("Post \"{}\" saved", post.post.title)).await;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.blog_service.delete(id).await?;
    notify_saved(&state, "Post deleted").await;
    Ok(StatusCode::NO_CONTENT)
}
