//! Event category repository

use crate::db::{with_driver, DynDatabasePool, InsertedId};
use crate::models::EventCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Event category repository trait
#[async_trait]
pub trait EventCategoryRepository: Send + Sync {
    /// List all categories by sort order, then name
    async fn list(&self) -> Result<Vec<EventCategory>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EventCategory>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<EventCategory>>;

    /// Insert a category; `id` on the input is ignored
    async fn create(&self, category: &EventCategory) -> Result<EventCategory>;

    /// Delete a category. Events in it become uncategorized.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based event category repository implementation
pub struct SqlxEventCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxEventCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EventCategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EventCategoryRepository for SqlxEventCategoryRepository {
    async fn list(&self) -> Result<Vec<EventCategory>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, EventCategory>(
                "SELECT id, slug, name, sort_order FROM event_categories ORDER BY sort_order, name",
            )
            .fetch_all(conn)
            .await
            .context("Failed to list event categories")
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EventCategory>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, EventCategory>(
                "SELECT id, slug, name, sort_order FROM event_categories WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(conn)
            .await
            .context("Failed to get event category")
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<EventCategory>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, EventCategory>(
                "SELECT id, slug, name, sort_order FROM event_categories WHERE slug = ?",
            )
            .bind(slug)
            .fetch_optional(conn)
            .await
            .context("Failed to get event category by slug")
        })
    }

    async fn create(&self, category: &EventCategory) -> Result<EventCategory> {
        let id = with_driver!(self.pool, |conn| {
            sqlx::query("INSERT INTO event_categories (slug, name, sort_order) VALUES (?, ?, ?)")
                .bind(&category.slug)
                .bind(&category.name)
                .bind(category.sort_order)
                .execute(conn)
                .await
                .context("Failed to create event category")?
                .inserted_id()
        });
        Ok(EventCategory { id, ..category.clone() })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_driver!(self.pool, |conn| {
            sqlx::query("DELETE FROM event_categories WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete event category")?;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    fn category(slug: &str, name: &str, sort_order: i32) -> EventCategory {
        EventCategory {
            id: 0,
            slug: slug.to_string(),
            name: name.to_string(),
            sort_order,
        }
    }

    #[tokio::test]
    async fn test_category_crud_and_ordering() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxEventCategoryRepository::new(pool);

        let b = repo.create(&category("b", "Workshops", 1)).await.unwrap();
        repo.create(&category("a", "Trade Shows", 0)).await.unwrap();

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Trade Shows", "Workshops"]);

        assert_eq!(repo.get_by_slug("b").await.unwrap().unwrap().id, b.id);
        assert!(repo.create(&category("b", "Dup", 3)).await.is_err());

        repo.delete(b.id).await.unwrap();
        assert!(repo.get_by_id(b.id).await.unwrap().is_none());
    }
}
