//! Event service
//!
//! Implements business logic for events:
//! - Public listings (published only) and admin listings (with drafts)
//! - Create, update, delete with slug generation and date validation
//! - Cover images and gallery images through staged uploads
//! - Categories and related events
//! - Read caching; every write invalidates `events:*`

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{EventCategoryRepository, EventImageRepository, EventRepository};
use crate::models::{
    Event, EventCategory, EventCategoryInput, EventFilter, EventImage, EventImageInput,
    EventImageView, EventInput, EventView, ListParams, PagedResult,
};
use crate::services::date_range::{format_date_range, parse_iso_datetime};
use crate::services::error::ServiceError;
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::{slug_or_fallback, slugify, unique_slug};
use crate::services::staging::StagingService;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Bucket holding cover and gallery images
pub const EVENTS_BUCKET: &str = "event-images";

/// Related events returned when the caller gives no limit
pub const DEFAULT_RELATED_LIMIT: i64 = 4;

const COVER_PREFIX: &str = "covers";

const CACHE_PATTERN: &str = "events:*";
const CACHE_KEY_LIST: &str = "events:list";
const CACHE_KEY_EVENT: &str = "events:get:";
const CACHE_KEY_RELATED: &str = "events:related:";
const CACHE_KEY_IMAGES: &str = "events:images:";
const CACHE_KEY_CATEGORIES: &str = "events:categories";

/// Public listing query
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Category slug
    pub category: Option<String>,
    pub upcoming: bool,
}

/// Event service
pub struct EventService {
    repo: Arc<dyn EventRepository>,
    category_repo: Arc<dyn EventCategoryRepository>,
    image_repo: Arc<dyn EventImageRepository>,
    staging: Arc<StagingService>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
    cache_ttl: Duration,
}

impl EventService {
    pub fn new(
        repo: Arc<dyn EventRepository>,
        category_repo: Arc<dyn EventCategoryRepository>,
        image_repo: Arc<dyn EventImageRepository>,
        staging: Arc<StagingService>,
        cache: Arc<Cache>,
    ) -> Self {
        let cache_ttl = cache.default_ttl();
        Self {
            repo,
            category_repo,
            image_repo,
            staging,
            cache,
            markdown: MarkdownRenderer::new(),
            cache_ttl,
        }
    }

    /// Published events, ordered by start date
    pub async fn list_published(
        &self,
        query: &EventQuery,
        params: &ListParams,
    ) -> Result<PagedResult<EventView>, ServiceError> {
        let cache_key = format!(
            "{}:{}:{}:{}:{}",
            CACHE_KEY_LIST,
            query.category.as_deref().unwrap_or("*"),
            query.upcoming,
            params.page,
            params.per_page
        );
        if let Ok(Some(cached)) = self.cache.get::<PagedResult<EventView>>(&cache_key).await {
            return Ok(cached);
        }

        let filter = EventFilter {
            category: query.category.clone().filter(|c| !c.is_empty()),
            upcoming: query.upcoming,
            include_drafts: false,
        };
        let result = self.list_filtered(&filter, params).await?;

        let _ = self.cache.set(&cache_key, &result, self.cache_ttl).await;
        Ok(result)
    }

    /// All events including drafts, for the admin panel. Not cached.
    pub async fn list_admin(&self, params: &ListParams) -> Result<PagedResult<EventView>, ServiceError> {
        let filter = EventFilter {
            include_drafts: true,
            ..Default::default()
        };
        self.list_filtered(&filter, params).await
    }

    /// Next published events that have not ended yet
    pub async fn upcoming(&self, limit: u32) -> Result<Vec<EventView>, ServiceError> {
        let query = EventQuery {
            category: None,
            upcoming: true,
        };
        let page = self.list_published(&query, &ListParams::new(1, limit)).await?;
        Ok(page.items)
    }

    async fn list_filtered(
        &self,
        filter: &EventFilter,
        params: &ListParams,
    ) -> Result<PagedResult<EventView>, ServiceError> {
        let (events, total) = self
            .repo
            .list(filter, Utc::now(), params)
            .await
            .context("Failed to list events")?;
        let categories = self.categories_uncached().await?;
        let views = events
            .into_iter()
            .map(|e| self.to_view(e, &categories))
            .collect();
        Ok(PagedResult::new(views, total, params))
    }

    /// Look up by numeric id or slug. Drafts are only visible with
    /// `include_drafts`.
    pub async fn get(&self, id_or_slug: &str, include_drafts: bool) -> Result<EventView, ServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_EVENT, id_or_slug);
        if !include_drafts {
            if let Ok(Some(cached)) = self.cache.get::<EventView>(&cache_key).await {
                return Ok(cached);
            }
        }

        let mut event = match id_or_slug.parse::<i64>() {
            Ok(id) => self.repo.get_by_id(id).await.context("Failed to get event")?,
            Err(_) => None,
        };
        if event.is_none() {
            event = self
                .repo
                .get_by_slug(id_or_slug)
                .await
                .context("Failed to get event by slug")?;
        }
        let event = event
            .filter(|e| include_drafts || e.is_published)
            .ok_or_else(|| ServiceError::not_found("Event"))?;

        let categories = self.categories_uncached().await?;
        let view = self.to_view(event, &categories);

        if !include_drafts {
            let _ = self.cache.set(&cache_key, &view, self.cache_ttl).await;
        }
        Ok(view)
    }

    /// Create an event from the editor form
    pub async fn create(&self, input: EventInput) -> Result<EventView, ServiceError> {
        let event = self.prepare(input, None).await?;
        let created = self.repo.create(&event).await.map_err(ServiceError::db)?;

        tracing::info!("Created event {} ({})", created.id, created.slug);
        self.invalidate().await;

        let categories = self.categories_uncached().await?;
        Ok(self.to_view(created, &categories))
    }

    /// Replace every editable field of an event
    pub async fn update(&self, id: i64, input: EventInput) -> Result<EventView, ServiceError> {
        let existing = self.require(id).await?;
        let event = self.prepare(input, Some(&existing)).await?;
        let updated = self.repo.update(&event).await.map_err(ServiceError::db)?;

        self.staging
            .remove_superseded(EVENTS_BUCKET, existing.cover_image.as_deref(), updated.cover_image.as_deref())
            .await;
        tracing::info!("Updated event {} ({})", updated.id, updated.slug);
        self.invalidate().await;

        let categories = self.categories_uncached().await?;
        Ok(self.to_view(updated, &categories))
    }

    /// Delete an event, its gallery rows and its stored images
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let event = self.require(id).await?;
        let images = self
            .image_repo
            .list_by_event(id)
            .await
            .context("Failed to list event images")?;

        self.repo.delete(id).await.map_err(ServiceError::db)?;

        let paths: Vec<String> = event
            .cover_image
            .into_iter()
            .chain(images.into_iter().map(|i| i.path))
            .collect();
        if !paths.is_empty() {
            if let Err(e) = self.staging.store().remove(EVENTS_BUCKET, &paths).await {
                tracing::warn!("Failed to remove images of deleted event {}: {}", id, e);
            }
        }

        tracing::info!("Deleted event {}", id);
        self.invalidate().await;
        Ok(())
    }

    /// Published events in the same category, upcoming first
    pub async fn related(&self, id: i64, limit: Option<i64>) -> Result<Vec<EventView>, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_RELATED_LIMIT).clamp(1, 24);
        let cache_key = format!("{}{}:{}", CACHE_KEY_RELATED, id, limit);
        if let Ok(Some(cached)) = self.cache.get::<Vec<EventView>>(&cache_key).await {
            return Ok(cached);
        }

        let event = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get event")?
            .filter(|e| e.is_published)
            .ok_or_else(|| ServiceError::not_found("Event"))?;

        let related = match event.category_id {
            Some(category_id) => self
                .repo
                .list_related(category_id, id, Utc::now(), limit)
                .await
                .context("Failed to list related events")?,
            None => Vec::new(),
        };
        let categories = self.categories_uncached().await?;
        let views: Vec<EventView> = related
            .into_iter()
            .map(|e| self.to_view(e, &categories))
            .collect();

        let _ = self.cache.set(&cache_key, &views, self.cache_ttl).await;
        Ok(views)
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn list_categories(&self) -> Result<Vec<EventCategory>, ServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<EventCategory>>(CACHE_KEY_CATEGORIES).await {
            return Ok(cached);
        }
        let categories = self.categories_uncached().await?;
        let _ = self.cache.set(CACHE_KEY_CATEGORIES, &categories, self.cache_ttl).await;
        Ok(categories)
    }

    pub async fn create_category(&self, input: EventCategoryInput) -> Result<EventCategory, ServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Category name cannot be empty"));
        }
        let slug = match input.slug.as_deref().map(slugify).filter(|s| !s.is_empty()) {
            Some(slug) => slug,
            None => slug_or_fallback(name),
        };
        if self
            .category_repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check category slug")?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!("Category '{}' already exists", slug)));
        }

        let category = EventCategory {
            id: 0,
            slug,
            name: name.to_string(),
            sort_order: input.sort_order,
        };
        let created = self.category_repo.create(&category).await.map_err(ServiceError::db)?;
        self.invalidate().await;
        Ok(created)
    }

    /// Delete a category; its events become uncategorized
    pub async fn delete_category(&self, id: i64) -> Result<(), ServiceError> {
        self.category_repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| ServiceError::not_found("Category"))?;
        self.category_repo.delete(id).await.map_err(ServiceError::db)?;
        self.invalidate().await;
        Ok(())
    }

    // ========================================================================
    // Gallery
    // ========================================================================

    /// Gallery of a published event
    pub async fn list_images(&self, event_id: i64) -> Result<Vec<EventImageView>, ServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_IMAGES, event_id);
        if let Ok(Some(cached)) = self.cache.get::<Vec<EventImageView>>(&cache_key).await {
            return Ok(cached);
        }

        self.repo
            .get_by_id(event_id)
            .await
            .context("Failed to get event")?
            .filter(|e| e.is_published)
            .ok_or_else(|| ServiceError::not_found("Event"))?;

        let views: Vec<EventImageView> = self
            .image_repo
            .list_by_event(event_id)
            .await
            .context("Failed to list event images")?
            .into_iter()
            .map(|image| self.image_view(image))
            .collect();

        let _ = self.cache.set(&cache_key, &views, self.cache_ttl).await;
        Ok(views)
    }

    /// Append an image to an event's gallery
    pub async fn add_image(&self, event_id: i64, input: EventImageInput) -> Result<EventImageView, ServiceError> {
        self.require(event_id).await?;

        let caption = input
            .caption
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let path = self
            .staging
            .commit(&input.image, EVENTS_BUCKET, &format!("gallery/{}", event_id))
            .await?;

        let image = self
            .image_repo
            .append(event_id, &path, caption)
            .await
            .map_err(ServiceError::db)?;

        self.invalidate().await;
        Ok(self.image_view(image))
    }

    /// Remove a gallery image and its stored object
    pub async fn remove_image(&self, event_id: i64, image_id: i64) -> Result<(), ServiceError> {
        let image = self
            .image_repo
            .get_by_id(image_id)
            .await
            .context("Failed to get event image")?
            .filter(|i| i.event_id == event_id)
            .ok_or_else(|| ServiceError::not_found("Event image"))?;

        self.image_repo.delete(image_id).await.map_err(ServiceError::db)?;
        self.staging
            .remove_superseded(EVENTS_BUCKET, Some(&image.path), None)
            .await;

        self.invalidate().await;
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn require(&self, id: i64) -> Result<Event, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get event")?
            .ok_or_else(|| ServiceError::not_found("Event"))
    }

    async fn categories_uncached(&self) -> Result<Vec<EventCategory>, ServiceError> {
        let categories = self
            .category_repo
            .list()
            .await
            .context("Failed to list event categories")?;
        Ok(categories)
    }

    /// Validate the form and build the row to store. The cover image is
    /// committed last, once everything else has been accepted.
    async fn prepare(&self, input: EventInput, existing: Option<&Event>) -> Result<Event, ServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ServiceError::validation("Title cannot be empty"));
        }

        let starts_at = parse_iso_datetime(&input.starts_at)?;
        let ends_at = match input.ends_at.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_iso_datetime(raw)?),
            None => None,
        };
        if let Some(ends_at) = ends_at {
            if ends_at < starts_at {
                return Err(ServiceError::validation("End date cannot be before start date"));
            }
        }

        if let Some(category_id) = input.category_id {
            self.category_repo
                .get_by_id(category_id)
                .await
                .context("Failed to get category")?
                .ok_or_else(|| ServiceError::validation(format!("Unknown category: {}", category_id)))?;
        }

        // A saved record keeps its slug unless a new one is given
        let exclude_id = existing.map(|e| e.id);
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

        let cover_image = self
            .staging
            .commit_optional(input.cover_image.as_ref(), EVENTS_BUCKET, COVER_PREFIX)
            .await?;

        let now = Utc::now();
        Ok(Event {
            id: exclude_id.unwrap_or(0),
            slug,
            title,
            summary: input.summary.trim().to_string(),
            description_html: self.markdown.render(&input.description),
            description: input.description,
            venue: input.venue.trim().to_string(),
            city: input.city.trim().to_string(),
            starts_at,
            ends_at,
            category_id: input.category_id,
            cover_image,
            registration_url: input
                .registration_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            is_published: input.is_published,
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
        })
    }

    fn to_view(&self, event: Event, categories: &[EventCategory]) -> EventView {
        let category = event
            .category_id
            .and_then(|id| categories.iter().find(|c| c.id == id).cloned());
        EventView {
            date_label: format_date_range(event.starts_at, event.ends_at),
            cover_image_url: event
                .cover_image
                .as_deref()
                .map(|path| self.staging.public_url(EVENTS_BUCKET, path)),
            category,
            event,
        }
    }

    fn image_view(&self, image: EventImage) -> EventImageView {
        EventImageView {
            url: self.staging.public_url(EVENTS_BUCKET, &image.path),
            image,
        }
    }

    async fn invalidate(&self) {
        let _ = self.cache.delete_pattern(CACHE_PATTERN).await;
    }
}
