//! API middleware
//!
//! Contains:
//! - Application state shared by all handlers
//! - The JSON error envelope and its mapping from service errors
//! - Authentication (session token from header or cookie)
//! - Error notices for failed admin changes

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxBlogPostRepository, SqlxEventCategoryRepository, SqlxEventImageRepository,
    SqlxEventRepository, SqlxPortfolioRepository, SqlxSectionRepository, SqlxSessionRepository,
    SqlxSettingsRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    friendly_message, BlogService, CompanyProfileService, EventService, ImageService,
    LoginRateLimiter, NotificationCenter, PortfolioService, RpcService, SectionService,
    ServiceError, StagingError, StagingService, Throttled, UserService, UserServiceError,
};
use crate::storage::{DynObjectStore, StorageError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub event_service: Arc<EventService>,
    pub portfolio_service: Arc<PortfolioService>,
    pub section_service: Arc<SectionService>,
    pub blog_service: Arc<BlogService>,
    pub company_profile_service: Arc<CompanyProfileService>,
    pub image_service: Arc<ImageService>,
    pub rpc_service: Arc<RpcService>,
    pub staging: Arc<StagingService>,
    pub notifications: NotificationCenter,
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool
    pub fn new(config: Config, pool: DynDatabasePool, store: DynObjectStore) -> Self {
        let cache = create_cache(&config.cache);
        let staging = Arc::new(StagingService::new(&config.staging, &config.storage, store.clone()));

        let user_service = Arc::new(UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.admin.session_days,
        ));
        let event_service = Arc::new(EventService::new(
            SqlxEventRepository::boxed(pool.clone()),
            SqlxEventCategoryRepository::boxed(pool.clone()),
            SqlxEventImageRepository::boxed(pool.clone()),
            staging.clone(),
            cache.clone(),
        ));
        let portfolio_service = Arc::new(PortfolioService::new(
            SqlxPortfolioRepository::boxed(pool.clone()),
            staging.clone(),
            cache.clone(),
        ));
        let section_service = Arc::new(SectionService::new(
            SqlxSectionRepository::boxed(pool.clone()),
            staging.clone(),
            cache.clone(),
        ));
        let blog_service = Arc::new(BlogService::new(
            SqlxBlogPostRepository::boxed(pool.clone()),
            staging.clone(),
            cache.clone(),
        ));
        let company_profile_service = Arc::new(CompanyProfileService::new(
            SqlxSettingsRepository::boxed(pool.clone()),
            staging.clone(),
            cache,
        ));
        let rpc_service = Arc::new(RpcService::new(
            event_service.clone(),
            portfolio_service.clone(),
            section_service.clone(),
        ));

        Self {
            notifications: NotificationCenter::new(&config.notifications),
            config: Arc::new(config),
            pool,
            user_service,
            event_service,
            portfolio_service,
            section_service,
            blog_service,
            company_profile_service,
            image_service: Arc::new(ImageService::new(store)),
            rpc_service,
            staging,
            login_limiter: Arc::new(LoginRateLimiter::new()),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Message of a failed request, attached to the response for the
/// notification layer
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new("PAYLOAD_TOO_LARGE", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = ErrorMessage(self.error.message.clone());
        let mut response = (status, Json(self)).into_response();
        response.extensions_mut().insert(message);
        response
    }
}

fn rejected(message: String) -> ApiError {
    if message.starts_with("File too large") {
        ApiError::payload_too_large(message)
    } else {
        ApiError::validation_error(message)
    }
}

impl From<Throttled> for ApiError {
    fn from(err: Throttled) -> Self {
        ApiError::with_details(
            "RATE_LIMIT",
            err.to_string(),
            serde_json::json!({ "retry_after": err.retry_after() }),
        )
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Rejected(message) => rejected(message),
            StorageError::AlreadyExists(_) => ApiError::conflict(err.to_string()),
            StorageError::UnknownBucket(_) | StorageError::InvalidPath(_) => {
                ApiError::validation_error(err.to_string())
            }
            StorageError::Io(e) => {
                tracing::error!("Storage I/O error: {}", e);
                ApiError::internal_error("Storage I/O error")
            }
        }
    }
}

impl From<StagingError> for ApiError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::Rejected(message) => rejected(message),
            StagingError::Storage(e) => e.into(),
            other => ApiError::validation_error(other.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            ServiceError::Validation(message) => ApiError::validation_error(message),
            ServiceError::Conflict(message) => ApiError::conflict(message),
            ServiceError::Storage(e) => e.into(),
            ServiceError::Staging(e) => e.into(),
            ServiceError::Internal(e) => {
                let raw = format!("{:#}", e);
                tracing::error!("Request failed: {}", raw);
                ApiError::internal_error(friendly_message(&raw))
            }
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(message) => ApiError::unauthorized(message),
            UserServiceError::ValidationError(message) => ApiError::validation_error(message),
            UserServiceError::UserExists(message) => ApiError::conflict(message),
            UserServiceError::InternalError(e) => {
                tracing::error!("User service error: {:#}", e);
                ApiError::internal_error("Internal error")
            }
        }
    }
}

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Extract session token from the `Authorization: Bearer` header or the
/// session cookie
pub fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some((name, value)) = cookie.trim().split_once('=') {
                    if name == SESSION_COOKIE && !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Push an error notice when an admin change fails.
///
/// Reads are left alone; so are authentication failures, which the login
/// screen reports itself.
pub async fn notify_failures(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let is_change = ![Method::GET, Method::HEAD, Method::OPTIONS].contains(&method);
    let response = next.run(request).await;

    if is_change && response.status() != StatusCode::UNAUTHORIZED {
        if let Some(ErrorMessage(message)) = response.extensions().get::<ErrorMessage>() {
            state.notifications.error(message.clone()).await;
        }
    }
    response
}

/// Stop browsers from sniffing served files into another type, and run
/// SVG documents (which may carry script) in a sandbox
pub async fn harden_file_responses(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let is_svg = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().to_ascii_lowercase().starts_with("image/svg+xml"));

    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    if is_svg {
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("sandbox; default-src 'none'; style-src 'unsafe-inline'"),
        );
    }
    response
}
