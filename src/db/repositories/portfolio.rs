//! Portfolio repository

use crate::db::{with_driver, DynDatabasePool, InsertedId};
use crate::models::{PortfolioItem, PortfolioItemRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Portfolio repository trait
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    /// All items in gallery order
    async fn list(&self) -> Result<Vec<PortfolioItem>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<PortfolioItem>>;

    /// Sort order one past the current last item
    async fn next_sort_order(&self) -> Result<i32>;

    async fn create(&self, record: &PortfolioItemRecord) -> Result<PortfolioItem>;

    /// Returns `None` when no item has this id
    async fn update(&self, id: i64, record: &PortfolioItemRecord) -> Result<Option<PortfolioItem>>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Delete every item and insert `records`, in one transaction
    async fn replace_all(&self, records: &[PortfolioItemRecord]) -> Result<Vec<PortfolioItem>>;
}

/// SQLx-based portfolio repository implementation
pub struct SqlxPortfolioRepository {
    pool: DynDatabasePool,
}

impl SqlxPortfolioRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PortfolioRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_ITEM: &str = r#"
    SELECT id, title, client, category, description, image_path, sort_order, created_at, updated_at
    FROM portfolio_items
"#;

const INSERT_ITEM: &str = r#"
    INSERT INTO portfolio_items
        (title, client, category, description, image_path, sort_order, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[async_trait]
impl PortfolioRepository for SqlxPortfolioRepository {
    async fn list(&self) -> Result<Vec<PortfolioItem>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, PortfolioItem>(&format!("{SELECT_ITEM} ORDER BY sort_order, id"))
                .fetch_all(conn)
                .await
                .context("Failed to list portfolio items")
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PortfolioItem>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, PortfolioItem>(&format!("{SELECT_ITEM} WHERE id = ?"))
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get portfolio item")
        })
    }

    async fn next_sort_order(&self) -> Result<i32> {
        let next: i64 = with_driver!(self.pool, |conn| {
            sqlx::query_scalar(
                "SELECT CAST(COALESCE(MAX(sort_order) + 1, 0) AS SIGNED) FROM portfolio_items",
            )
            .fetch_one(conn)
            .await
            .context("Failed to read portfolio order")?
        });
        Ok(next as i32)
    }

    async fn create(&self, record: &PortfolioItemRecord) -> Result<PortfolioItem> {
        let now = Utc::now();
        let id = with_driver!(self.pool, |conn| {
            sqlx::query(INSERT_ITEM)
                .bind(&record.title)
                .bind(&record.client)
                .bind(&record.category)
                .bind(&record.description)
                .bind(&record.image_path)
                .bind(record.sort_order)
                .bind(now)
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to create portfolio item")?
                .inserted_id()
        });
        Ok(to_item(id, record, now, now))
    }

    async fn update(&self, id: i64, record: &PortfolioItemRecord) -> Result<Option<PortfolioItem>> {
        let now = Utc::now();
        with_driver!(self.pool, |conn| {
            sqlx::query(
                r#"
                UPDATE portfolio_items
                SET title = ?, client = ?, category = ?, description = ?, image_path = ?,
                    sort_order = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&record.title)
            .bind(&record.client)
            .bind(&record.category)
            .bind(&record.description)
            .bind(&record.image_path)
            .bind(record.sort_order)
            .bind(now)
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update portfolio item")?;
        });
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_driver!(self.pool, |conn| {
            sqlx::query("DELETE FROM portfolio_items WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete portfolio item")?;
        });
        Ok(())
    }

    async fn replace_all(&self, records: &[PortfolioItemRecord]) -> Result<Vec<PortfolioItem>> {
        let now = Utc::now();
        with_driver!(self.pool, |conn| {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;

            sqlx::query("DELETE FROM portfolio_items")
                .execute(&mut *tx)
                .await
                .context("Failed to clear portfolio items")?;

            let mut items = Vec::with_capacity(records.len());
            for record in records {
                let id = sqlx::query(INSERT_ITEM)
                    .bind(&record.title)
                    .bind(&record.client)
                    .bind(&record.category)
                    .bind(&record.description)
                    .bind(&record.image_path)
                    .bind(record.sort_order)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to insert portfolio item")?
                    .inserted_id();
                items.push(to_item(id, record, now, now));
            }

            tx.commit().await.context("Failed to commit portfolio replacement")?;
            Ok(items)
        })
    }
}

fn to_item(
    id: i64,
    record: &PortfolioItemRecord,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
) -> PortfolioItem {
    PortfolioItem {
        id,
        title: record.title.clone(),
        client: record.client.clone(),
        category: record.category.clone(),
        description: record.description.clone(),
        image_path: record.image_path.clone(),
        sort_order: record.sort_order,
        created_at,
        updated_at,
    }
}
