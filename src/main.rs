//! Showfloor - content backend for an exhibition and events site

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showfloor::{
    api::{self, AppState},
    config::Config,
    db,
    storage::{DynObjectStore, LocalObjectStore},
};

/// How often expired sessions are pruned
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;
/// How often stale login attempts are forgotten
const LOGIN_LIMITER_CLEANUP_INTERVAL_SECS: u64 = 300;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showfloor=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Showfloor...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Object storage
    let store = LocalObjectStore::new(&config.storage);
    store
        .ensure_buckets()
        .await
        .with_context(|| format!("Failed to create buckets under {}", config.storage.path.display()))?;
    tracing::info!("Storage ready at {}", store.root().display());
    let store: DynObjectStore = Arc::new(store);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let admin = config.admin.clone();
    let state = AppState::new(config, pool, store);

    // First start: create the configured admin account
    if let Some(user) = state.user_service.bootstrap_admin(&admin).await? {
        tracing::info!("Created admin account {}", user.username);
    }

    // Start session cleanup task
    {
        let user_service = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                SESSION_CLEANUP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!("Removed {} expired session(s)", count),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Start login rate limiter cleanup task
    {
        let limiter = state.login_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                LOGIN_LIMITER_CLEANUP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    // Build router
    let app = api::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
