//! Blog post repository

use crate::db::{with_driver, DynDatabasePool, InsertedId};
use crate::models::{BlogPost, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Blog post repository trait
#[async_trait]
pub trait BlogPostRepository: Send + Sync {
    /// Insert a post; `id` on the input is ignored
    async fn create(&self, post: &BlogPost) -> Result<BlogPost>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    /// Check whether a slug is taken by a post other than `exclude_id`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Newest first. Drafts only when `include_drafts`.
    async fn list(&self, include_drafts: bool, params: &ListParams) -> Result<(Vec<BlogPost>, i64)>;

    async fn update(&self, post: &BlogPost) -> Result<BlogPost>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based blog post repository implementation
pub struct SqlxBlogPostRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogPostRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_POST: &str = r#"
    SELECT id, slug, title, excerpt, content, content_html, cover_image, is_published,
           published_at, created_at, updated_at
    FROM blog_posts
"#;

#[async_trait]
impl BlogPostRepository for SqlxBlogPostRepository {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost> {
        let id = with_driver!(self.pool, |conn| {
            sqlx::query(
                r#"
                INSERT INTO blog_posts (slug, title, excerpt, content, content_html, cover_image,
                                        is_published, published_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.content_html)
            .bind(&post.cover_image)
            .bind(post.is_published)
            .bind(post.published_at)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(conn)
            .await
            .context("Failed to create blog post")?
            .inserted_id()
        });
        Ok(BlogPost { id, ..post.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, BlogPost>(&format!("{SELECT_POST} WHERE id = ?"))
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get blog post by ID")
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_as::<_, BlogPost>(&format!("{SELECT_POST} WHERE slug = ?"))
                .bind(slug)
                .fetch_optional(conn)
                .await
                .context("Failed to get blog post by slug")
        })
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = with_driver!(self.pool, |conn| {
            sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts WHERE slug = ? AND id <> ?")
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(conn)
                .await
                .context("Failed to check blog post slug")?
        });
        Ok(count > 0)
    }

    async fn list(&self, include_drafts: bool, params: &ListParams) -> Result<(Vec<BlogPost>, i64)> {
        with_driver!(self.pool, |conn| {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM blog_posts WHERE (? OR is_published = TRUE)",
            )
            .bind(include_drafts)
            .fetch_one(conn)
            .await
            .context("Failed to count blog posts")?;

            let posts = sqlx::query_as::<_, BlogPost>(&format!(
                r#"{SELECT_POST}
                WHERE (? OR is_published = TRUE)
                ORDER BY COALESCE(published_at, created_at) DESC, id DESC
                LIMIT ? OFFSET ?"#
            ))
            .bind(include_drafts)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(conn)
            .await
            .context("Failed to list blog posts")?;

            Ok((posts, total))
        })
    }

    async fn update(&self, post: &BlogPost) -> Result<BlogPost> {
        with_driver!(self.pool, |conn| {
            sqlx::query(
                r#"
                UPDATE blog_posts
                SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?,
                    cover_image = ?, is_published = ?, published_at = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.content_html)
            .bind(&post.cover_image)
            .bind(post.is_published)
            .bind(post.published_at)
            .bind(post.updated_at)
            .bind(post.id)
            .execute(conn)
            .await
            .context("Failed to update blog post")?;
        });
        Ok(post.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_driver!(self.pool, |conn| {
            sqlx::query("DELETE FROM blog_posts WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete blog post")?;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, TimeZone, Utc};

    fn post(slug: &str, published_days_ago: Option<i64>) -> BlogPost {
        let base = Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap();
        BlogPost {
            id: 0,
            slug: slug.to_string(),
            title: slug.to_string(),
            excerpt: String::new(),
            content: "# Hi".to_string(),
            content_html: "<h1>Hi</h1>".to_string(),
            cover_image: None,
            is_published: published_days_ago.is_some(),
            published_at: published_days_ago.map(|d| base - Duration::days(d)),
            created_at: base - Duration::days(100),
            updated_at: base,
        }
    }

    #[tokio::test]
    async fn test_list_newest_published_first() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxBlogPostRepository::new(pool);

        repo.create(&post("older", Some(10))).await.unwrap();
        repo.create(&post("newer", Some(1))).await.unwrap();
        let draft = repo.create(&post("draft", None)).await.unwrap();

        let (posts, total) = repo.list(false, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(posts[0].slug, "newer");

        let (_, total) = repo.list(true, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(total, 3);

        assert!(repo.slug_exists("draft", None).await.unwrap());
        assert!(!repo.slug_exists("draft", Some(draft.id)).await.unwrap());

        let mut published = draft.clone();
        published.is_published = true;
        published.published_at = Some(Utc::now());
        repo.update(&published).await.unwrap();
        assert!(repo.get_by_slug("draft").await.unwrap().unwrap().is_published);

        repo.delete(draft.id).await.unwrap();
        assert!(repo.get_by_id(draft.id).await.unwrap().is_none());
    }
}
