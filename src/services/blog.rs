//! Blog service
//!
//! News posts written in Markdown. Drafts are visible only in the admin
//! panel; `published_at` is stamped the first time a post goes live and is
//! kept if the post is later unpublished and republished.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::BlogPostRepository;
use crate::models::{BlogPost, BlogPostInput, BlogPostView, ListParams, PagedResult};
use crate::services::error::ServiceError;
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::{slug_or_fallback, slugify, unique_slug};
use crate::services::staging::StagingService;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Bucket holding blog cover images
pub const BLOG_BUCKET: &str = "blog-images";

/// Length of excerpts generated from the content
const EXCERPT_CHARS: usize = 200;

const COVER_PREFIX: &str = "covers";
const CACHE_KEY_LIST: &str = "blog:list:";
const CACHE_KEY_POST: &str = "blog:post:";
const CACHE_PATTERN: &str = "blog:*";

pub struct BlogService {
    repo: Arc<dyn BlogPostRepository>,
    staging: Arc<StagingService>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl BlogService {
    pub fn new(repo: Arc<dyn BlogPostRepository>, staging: Arc<StagingService>, cache: Arc<Cache>) -> Self {
        Self {
            repo,
            staging,
            cache,
            markdown: MarkdownRenderer::new(),
        }
    }

    /// Published posts, newest first
    pub async fn list_published(&self, params: &ListParams) -> Result<PagedResult<BlogPostView>, ServiceError> {
        let cache_key = format!("{}{}:{}", CACHE_KEY_LIST, params.page, params.per_page);
        if let Ok(Some(cached)) = self.cache.get::<PagedResult<BlogPostView>>(&cache_key).await {
            return Ok(cached);
        }
        let result = self.list(false, params).await?;
        let _ = self.cache.set(&cache_key, &result, self.cache.default_ttl()).await;
        Ok(result)
    }

    /// Every post including drafts
    pub async fn list_all(&self, params: &ListParams) -> Result<PagedResult<BlogPostView>, ServiceError> {
        self.list(true, params).await
    }

    async fn list(&self, include_drafts: bool, params: &ListParams) -> Result<PagedResult<BlogPostView>, ServiceError> {
        let (posts, total) = self
            .repo
            .list(include_drafts, params)
            .await
            .context("Failed to list blog posts")?;
        let views = posts.into_iter().map(|p| self.to_view(p)).collect();
        Ok(PagedResult::new(views, total, params))
    }

    /// A published post by slug
    pub async fn get_published(&self, slug: &str) -> Result<BlogPostView, ServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_POST, slug);
        if let Ok(Some(cached)) = self.cache.get::<BlogPostView>(&cache_key).await {
            return Ok(cached);
        }

        let post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get blog post by slug")?
            .filter(|p| p.is_published)
            .ok_or_else(|| ServiceError::not_found("Blog post"))?;
        let view = self.to_view(post);

        let _ = self.cache.set(&cache_key, &view, self.cache.default_ttl()).await;
        Ok(view)
    }

    pub async fn create(&self, input: BlogPostInput) -> Result<BlogPostView, ServiceError> {
        let post = self.prepare(input, None).await?;
        let created = self.repo.create(&post).await.map_err(ServiceError::db)?;

        tracing::info!("Created blog post {} ({})", created.id, created.slug);
        self.invalidate().await;
        Ok(self.to_view(created))
    }

    /// Replace every editable field of a post
    pub async fn update(&self, id: i64, input: BlogPostInput) -> Result<BlogPostView, ServiceError> {
        let existing = self.require(id).await?;
        let post = self.prepare(input, Some(&existing)).await?;
        let updated = self.repo.update(&post).await.map_err(ServiceError::db)?;

        self.staging
            .remove_superseded(BLOG_BUCKET, existing.cover_image.as_deref(), updated.cover_image.as_deref())
            .await;
        self.invalidate().await;
        Ok(self.to_view(updated))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let existing = self.require(id).await?;
        self.repo.delete(id).await.map_err(ServiceError::db)?;
        self.staging
            .remove_superseded(BLOG_BUCKET, existing.cover_image.as_deref(), None)
            .await;
        tracing::info!("Deleted blog post {}", id);
        self.invalidate().await;
        Ok(())
    }

    async fn require(&self, id: i64) -> Result<BlogPost, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get blog post")?
            .ok_or_else(|| ServiceError::not_found("Blog post"))
    }

    async fn prepare(&self, input: BlogPostInput, existing: Option<&BlogPost>) -> Result<BlogPost, ServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ServiceError::validation("Title cannot be empty"));
        }
        if input.content.trim().is_empty() {
            return Err(ServiceError::validation("Content cannot be empty"));
        }

        // A saved record keeps its slug unless a new one is given
        let exclude_id = existing.map(|p| p.id);
        let slug = match (input.slug.as_deref().map(slugify).filter(|s| !s.is_empty()), existing) {
            (None, Some(current)) => current.slug.clone(),
            (given, _) => {
                let base = given.unwrap_or_else(|| slug_or_fallback(&title));
                let repo = Arc::clone(&self.repo);
                unique_slug(&base, move |candidate| {
                    let repo = Arc::clone(&repo);
                    async move { repo.slug_exists(&candidate, exclude_id).await }
                })
                .await?
            }
        };

        let excerpt = match input.excerpt.trim() {
            "" => self.markdown.excerpt(&input.content, EXCERPT_CHARS),
            given => given.to_string(),
        };

        let cover_image = self
            .staging
            .commit_optional(input.cover_image.as_ref(), BLOG_BUCKET, COVER_PREFIX)
            .await?;

        let now = Utc::now();
        let published_at = match existing.and_then(|p| p.published_at) {
            Some(first) => Some(first),
            None if input.is_published => Some(now),
            None => None,
        };

        Ok(BlogPost {
            id: exclude_id.unwrap_or(0),
            slug,
            title,
            excerpt,
            content_html: self.markdown.render(&input.content),
            content: input.content,
            cover_image,
            is_published: input.is_published,
            published_at,
            created_at: existing.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        })
    }

    fn to_view(&self, post: BlogPost) -> BlogPostView {
        BlogPostView {
            cover_image_url: post
                .cover_image
                .as_deref()
                .map(|path| self.staging.public_url(BLOG_BUCKET, path)),
            post,
        }
    }

    async fn invalidate(&self) {
        let _ = self.cache.delete_pattern(CACHE_PATTERN).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, StagingConfig, StorageConfig};
    use crate::db::repositories::SqlxBlogPostRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::storage::{DynObjectStore, LocalObjectStore};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, BlogService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store: DynObjectStore = Arc::new(LocalObjectStore::new(&storage));
        let staging = Arc::new(StagingService::new(&StagingConfig::default(), &storage, store));
        let service = BlogService::new(
            SqlxBlogPostRepository::boxed(pool),
            staging,
            crate::cache::create_cache(&CacheConfig::default()),
        );
        (dir, service)
    }

    fn post(title: &str, published: bool) -> BlogPostInput {
        BlogPostInput {
            title: title.to_string(),
            slug: None,
            excerpt: String::new(),
            content: "# Show recap\n\nThree halls, *one* week.".to_string(),
            cover_image: None,
            is_published: published,
        }
    }

    #[tokio::test]
    async fn test_create_renders_and_excerpts() {
        let (_dir, service) = setup().await;
        let view = service.create(post("Show Recap", true)).await.unwrap();

        assert_eq!(view.post.slug, "show-recap");
        assert!(view.post.content_html.contains("<h1>Show recap</h1>"));
        assert_eq!(view.post.excerpt, "Show recap Three halls, one week.");
        assert!(view.post.published_at.is_some());
    }

    #[tokio::test]
    async fn test_draft_not_public() {
        let (_dir, service) = setup().await;
        let draft = service.create(post("Draft", false)).await.unwrap();
        assert!(draft.post.published_at.is_none());

        assert!(matches!(service.get_published("draft").await, Err(ServiceError::NotFound(_))));
        assert_eq!(service.list_published(&ListParams::default()).await.unwrap().total, 0);
        assert_eq!(service.list_all(&ListParams::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_published_at_set_once() {
        let (_dir, service) = setup().await;
        let draft = service.create(post("News", false)).await.unwrap();

        let published = service.update(draft.post.id, post("News", true)).await.unwrap();
        let first = published.post.published_at.expect("stamped on publish");

        let unpublished = service.update(draft.post.id, post("News", false)).await.unwrap();
        assert_eq!(unpublished.post.published_at, Some(first));
        let republished = service.update(draft.post.id, post("News", true)).await.unwrap();
        assert_eq!(republished.post.published_at, Some(first));
    }

    #[tokio::test]
    async fn test_update_publishes_into_cached_list() {
        let (_dir, service) = setup().await;
        let draft = service.create(post("Later", false)).await.unwrap();
        assert_eq!(service.list_published(&ListParams::default()).await.unwrap().total, 0);

        service.update(draft.post.id, post("Later", true)).await.unwrap();
        let list = service.list_published(&ListParams::default()).await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(service.get_published("later").await.unwrap().post.id, draft.post.id);
    }

    #[tokio::test]
    async fn test_update_keeps_slug_unless_given() {
        let (_dir, service) = setup().await;
        let mut form = post("Show Recap", true);
        form.slug = Some("recap".to_string());
        let created = service.create(form).await.unwrap();

        let renamed = service.update(created.post.id, post("Show Recap, Day Two", true)).await.unwrap();
        assert_eq!(renamed.post.slug, "recap");
        assert_eq!(service.get_published("recap").await.unwrap().post.title, "Show Recap, Day Two");
    }

    #[tokio::test]
    async fn test_validation_and_slug_collision() {
        let (_dir, service) = setup().await;
        let mut empty = post("Title", true);
        empty.content = "   ".to_string();
        assert!(matches!(service.create(empty).await, Err(ServiceError::Validation(_))));

        service.create(post("Same", true)).await.unwrap();
        let second = service.create(post("Same", true)).await.unwrap();
        assert_eq!(second.post.slug, "same-2");

        service.delete(second.post.id).await.unwrap();
        assert!(matches!(service.delete(second.post.id).await, Err(ServiceError::NotFound(_))));
    }
}
