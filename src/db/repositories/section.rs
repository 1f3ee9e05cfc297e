//! Page section repository

use crate::config::DatabaseDriver;
use crate::db::{with_driver, DynDatabasePool};
use crate::models::{Section, SectionItem, SectionItemRecord, SectionRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Section repository trait
#[async_trait]
pub trait SectionRepository: Send + Sync {
    /// Section record, if it was ever saved
    async fn get(&self, key: &str) -> Result<Option<Section>>;

    /// Child items in display order
    async fn items(&self, key: &str) -> Result<Vec<SectionItem>>;

    /// Upsert the section and, when `items` is given, replace its child
    /// rows. Both happen in one transaction.
    async fn save(
        &self,
        key: &str,
        record: &SectionRecord,
        items: Option<&[SectionItemRecord]>,
    ) -> Result<Section>;
}

/// SQLx-based section repository implementation
pub struct SqlxSectionRepository {
    pool: DynDatabasePool,
}

impl SqlxSectionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SectionRepository> {
        Arc::new(Self::new(pool))
    }

    fn upsert_sql(&self) -> &'static str {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                r#"
                INSERT INTO sections (section_key, title, subtitle, body, image_path, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(section_key) DO UPDATE SET
                    title = excluded.title,
                    subtitle = excluded.subtitle,
                    body = excluded.body,
                    image_path = excluded.image_path,
                    updated_at = excluded.updated_at
                "#
            }
            DatabaseDriver::Mysql => {
                r#"
                INSERT INTO sections (section_key, title, subtitle, body, image_path, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    title = VALUES(title),
                    subtitle = VALUES(subtitle),
                    body = VALUES(body),
                    image_path = VALUES(image_path),
                    updated_at = VALUES(updated_at)
                "#
            }
        }
    }
}

#[async_trait]
impl SectionRepository for SqlxSectionRepository {
    async fn get(&self, key: &str) -> Result<Option<Section>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, Section>(
                r#"
                SELECT section_key, title, subtitle, body, image_path, updated_at
                FROM sections
                WHERE section_key = ?
                "#,
            )
            .bind(key)
            .fetch_optional(conn)
            .await
            .context("Failed to get section")
        })
    }

    async fn items(&self, key: &str) -> Result<Vec<SectionItem>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, SectionItem>(
                r#"
                SELECT id, section_key, title, description, icon, image_path, sort_order
                FROM section_items
                WHERE section_key = ?
                ORDER BY sort_order, id
                "#,
            )
            .bind(key)
            .fetch_all(conn)
            .await
            .context("Failed to list section items")
        })
    }

    async fn save(
        &self,
        key: &str,
        record: &SectionRecord,
        items: Option<&[SectionItemRecord]>,
    ) -> Result<Section> {
        let now = Utc::now();
        let upsert = self.upsert_sql();

        with_driver!(self.pool, |conn| {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;

            sqlx::query(upsert)
                .bind(key)
                .bind(&record.title)
                .bind(&record.subtitle)
                .bind(&record.body)
                .bind(&record.image_path)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to save section")?;

            if let Some(items) = items {
                sqlx::query("DELETE FROM section_items WHERE section_key = ?")
                    .bind(key)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear section items")?;

                for (position, item) in items.iter().enumerate() {
                    sqlx::query(
                        r#"
                        INSERT INTO section_items
                            (section_key, title, description, icon, image_path, sort_order)
                        VALUES (?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(key)
                    .bind(&item.title)
                    .bind(&item.description)
                    .bind(&item.icon)
                    .bind(&item.image_path)
                    .bind(position as i32)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to insert section item")?;
                }
            }

            tx.commit().await.context("Failed to commit section")?;
        });

        Ok(Section {
            section_key: key.to_string(),
            title: record.title.clone(),
            subtitle: record.subtitle.clone(),
            body: record.body.clone(),
            image_path: record.image_path.clone(),
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    fn record(title: &str) -> SectionRecord {
        SectionRecord {
            title: title.to_string(),
            subtitle: String::new(),
            body: "We build booths.".to_string(),
            image_path: None,
        }
    }

    fn item(title: &str) -> SectionItemRecord {
        SectionItemRecord {
            title: title.to_string(),
            description: String::new(),
            icon: Some("star".to_string()),
            image_path: None,
        }
    }

    #[tokio::test]
    async fn test_save_upserts_and_replaces_items() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxSectionRepository::new(pool);

        assert!(repo.get("about_dedication").await.unwrap().is_none());

        repo.save("about_dedication", &record("First"), Some(&[item("a"), item("b")]))
            .await
            .unwrap();
        repo.save("about_dedication", &record("Second"), None).await.unwrap();

        let section = repo.get("about_dedication").await.unwrap().unwrap();
        assert_eq!(section.title, "Second");

        // Items survive a save without an item list.
        let items = repo.items("about_dedication").await.unwrap();
        assert_eq!(items.iter().map(|i| i.title.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(items[1].sort_order, 1);

        repo.save("about_dedication", &record("Third"), Some(&[item("c")]))
            .await
            .unwrap();
        let items = repo.items("about_dedication").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "c");
    }
}
