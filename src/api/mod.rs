//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the content backend:
//! - Event, category and gallery endpoints
//! - Blog endpoints
//! - Company profile and page section endpoints
//! - Portfolio endpoints
//! - Named procedures (RPC)
//! - Image library and staged uploads
//! - Auth and admin notifications
//! - Read-only object serving under /storage (SVG served sandboxed)

pub mod auth;
pub mod blog;
pub mod common;
pub mod company_profile;
pub mod events;
pub mod images;
pub mod middleware;
pub mod notifications;
pub mod portfolio;
pub mod rpc;
pub mod sections;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Room for multipart boundaries and text fields on top of the file itself
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (session required). Failed changes surface as notices.
    let admin_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .merge(events::admin_router())
        .merge(blog::admin_router())
        .merge(company_profile::admin_router())
        .merge(sections::admin_router())
        .merge(portfolio::admin_router())
        .merge(images::admin_router())
        .merge(upload::staging_router())
        .merge(notifications::admin_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::notify_failures,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .merge(events::public_router())
        .merge(blog::public_router())
        .merge(company_profile::public_router())
        .merge(sections::public_router())
        .merge(portfolio::public_router())
        .merge(rpc::router())
        .merge(admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match config.server.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!(
            "Ignoring invalid CORS origin: {}",
            config.server.cors_origin
        ),
    }

    let body_limit = (config.storage.max_file_size() + MULTIPART_OVERHEAD) as usize;

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .route("/health", get(health))
        .nest_service("/storage", ServeDir::new(&config.storage.path))
        .layer(axum_middleware::from_fn(middleware::harden_file_responses))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.pool.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {:#}", e);
        ApiError::internal_error("Database unavailable")
    })?;
    Ok(Json(json!({ "status": "ok" })))
}
