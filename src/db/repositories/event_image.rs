//! Event gallery image repository

use crate::db::{with_driver, DynDatabasePool, InsertedId};
use crate::models::EventImage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Event image repository trait
#[async_trait]
pub trait EventImageRepository: Send + Sync {
    /// Gallery of an event in display order
    async fn list_by_event(&self, event_id: i64) -> Result<Vec<EventImage>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EventImage>>;

    /// Append an image at the end of the event's gallery
    async fn append(&self, event_id: i64, path: &str, caption: Option<&str>) -> Result<EventImage>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based event image repository implementation
pub struct SqlxEventImageRepository {
    pool: DynDatabasePool,
}

impl SqlxEventImageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EventImageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EventImageRepository for SqlxEventImageRepository {
    async fn list_by_event(&self, event_id: i64) -> Result<Vec<EventImage>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, EventImage>(
                r#"
                SELECT id, event_id, path, caption, sort_order, created_at
                FROM event_images
                WHERE event_id = ?
                ORDER BY sort_order, id
                "#,
            )
            .bind(event_id)
            .fetch_all(conn)
            .await
            .context("Failed to list event images")
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EventImage>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, EventImage>(
                "SELECT id, event_id, path, caption, sort_order, created_at FROM event_images WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(conn)
            .await
            .context("Failed to get event image")
        })
    }

    async fn append(&self, event_id: i64, path: &str, caption: Option<&str>) -> Result<EventImage> {
        let created_at = Utc::now();
        with_driver!(self.pool, |conn| {
            let next: i64 = sqlx::query_scalar(
                "SELECT CAST(COALESCE(MAX(sort_order) + 1, 0) AS SIGNED) FROM event_images WHERE event_id = ?",
            )
            .bind(event_id)
            .fetch_one(conn)
            .await
            .context("Failed to read gallery order")?;
            let next = next as i32;

            let id = sqlx::query(
                r#"
                INSERT INTO event_images (event_id, path, caption, sort_order, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(event_id)
            .bind(path)
            .bind(caption)
            .bind(next)
            .bind(created_at)
            .execute(conn)
            .await
            .context("Failed to add event image")?
            .inserted_id();

            Ok(EventImage {
                id,
                event_id,
                path: path.to_string(),
                caption: caption.map(str::to_string),
                sort_order: next,
                created_at,
            })
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_driver!(self.pool, |conn| {
            sqlx::query("DELETE FROM event_images WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete event image")?;
        });
        Ok(())
    }
}
