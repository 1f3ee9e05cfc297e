//! Event repository
//!
//! Database operations for events.

use crate::db::{with_driver, DynDatabasePool, InsertedId};
use crate::models::{Event, EventFilter, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Event repository trait
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a new event; `id` on the input is ignored
    async fn create(&self, event: &Event) -> Result<Event>;

    /// Get event by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Event>>;

    /// Get event by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Event>>;

    /// Check whether a slug is taken by an event other than `exclude_id`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// List events matching `filter`, ordered by start date.
    /// Returns the page of events and the total match count.
    async fn list(
        &self,
        filter: &EventFilter,
        now: DateTime<Utc>,
        params: &ListParams,
    ) -> Result<(Vec<Event>, i64)>;

    /// Published events of a category other than `exclude_id`.
    /// Upcoming events come first, each group by start date.
    async fn list_related(
        &self,
        category_id: i64,
        exclude_id: i64,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Event>>;

    /// Update every editable column
    async fn update(&self, event: &Event) -> Result<Event>;

    /// Delete an event; its gallery rows cascade
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based event repository implementation
pub struct SqlxEventRepository {
    pool: DynDatabasePool,
}

impl SqlxEventRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EventRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_EVENT: &str = r#"
    SELECT id, slug, title, summary, description, description_html, venue, city,
           starts_at, ends_at, category_id, cover_image, registration_url, is_published,
           created_at, updated_at
    FROM events
"#;

// Bind order: include_drafts, category, category, upcoming, now
const FILTER_CLAUSE: &str = r#"
    WHERE (? OR is_published = TRUE)
      AND (? IS NULL OR category_id = (SELECT id FROM event_categories WHERE slug = ?))
      AND (? = FALSE OR COALESCE(ends_at, starts_at) >= ?)
"#;

#[async_trait]
impl EventRepository for SqlxEventRepository {
    async fn create(&self, event: &Event) -> Result<Event> {
        let id = with_driver!(self.pool, |conn| {
            sqlx::query(
                r#"
                INSERT INTO events (slug, title, summary, description, description_html, venue,
                                    city, starts_at, ends_at, category_id, cover_image,
                                    registration_url, is_published, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&event.slug)
            .bind(&event.title)
            .bind(&event.summary)
            .bind(&event.description)
            .bind(&event.description_html)
            .bind(&event.venue)
            .bind(&event.city)
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(event.category_id)
            .bind(&event.cover_image)
            .bind(&event.registration_url)
            .bind(event.is_published)
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(conn)
            .await
            .context("Failed to create event")?
            .inserted_id()
        });

        Ok(Event { id, ..event.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} WHERE id = ?"))
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get event by ID")
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} WHERE slug = ?"))
                .bind(slug)
                .fetch_optional(conn)
                .await
                .context("Failed to get event by slug")
        })
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = with_driver!(self.pool, |conn| {
            sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE slug = ? AND id <> ?")
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(conn)
                .await
                .context("Failed to check event slug")?
        });
        Ok(count > 0)
    }

    async fn list(
        &self,
        filter: &EventFilter,
        now: DateTime<Utc>,
        params: &ListParams,
    ) -> Result<(Vec<Event>, i64)> {
        with_driver!(self.pool, |conn| {
            let total: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM events {FILTER_CLAUSE}"))
                    .bind(filter.include_drafts)
                    .bind(&filter.category)
                    .bind(&filter.category)
                    .bind(filter.upcoming)
                    .bind(now)
                    .fetch_one(conn)
                    .await
                    .context("Failed to count events")?;

            let events = sqlx::query_as::<_, Event>(&format!(
                "{SELECT_EVENT} {FILTER_CLAUSE} ORDER BY starts_at ASC, id ASC LIMIT ? OFFSET ?"
            ))
            .bind(filter.include_drafts)
            .bind(&filter.category)
            .bind(&filter.category)
            .bind(filter.upcoming)
            .bind(now)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(conn)
            .await
            .context("Failed to list events")?;

            Ok((events, total))
        })
    }

    async fn list_related(
        &self,
        category_id: i64,
        exclude_id: i64,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Event>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, Event>(&format!(
                r#"{SELECT_EVENT}
                WHERE category_id = ? AND id <> ? AND is_published = TRUE
                ORDER BY CASE WHEN COALESCE(ends_at, starts_at) >= ? THEN 0 ELSE 1 END,
                         starts_at ASC
                LIMIT ?"#
            ))
            .bind(category_id)
            .bind(exclude_id)
            .bind(now)
            .bind(limit)
            .fetch_all(conn)
            .await
            .context("Failed to list related events")
        })
    }

    async fn update(&self, event: &Event) -> Result<Event> {
        with_driver!(self.pool, |conn| {
            sqlx::query(
                r#"
                UPDATE events
                SET slug = ?, title = ?, summary = ?, description = ?, description_html = ?,
                    venue = ?, city = ?, starts_at = ?, ends_at = ?, category_id = ?,
                    cover_image = ?, registration_url = ?, is_published = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&event.slug)
            .bind(&event.title)
            .bind(&event.summary)
            .bind(&event.description)
            .bind(&event.description_html)
            .bind(&event.venue)
            .bind(&event.city)
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(event.category_id)
            .bind(&event.cover_image)
            .bind(&event.registration_url)
            .bind(event.is_published)
            .bind(event.updated_at)
            .bind(event.id)
            .execute(conn)
            .await
            .context("Failed to update event")?;
        });
        Ok(event.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_driver!(self.pool, |conn| {
            sqlx::query("DELETE FROM events WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete event")?;
        });
        Ok(())
    }
}
