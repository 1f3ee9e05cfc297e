//! Portfolio service
//!
//! Gallery of past projects. Items are edited one by one or saved as a
//! whole list; the whole-list save replaces every row in one transaction.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::PortfolioRepository;
use crate::models::{ImageSlot, PortfolioItem, PortfolioItemInput, PortfolioItemRecord, PortfolioItemView};
use crate::services::error::ServiceError;
use crate::services::staging::StagingService;
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

/// Bucket holding portfolio images
pub const PORTFOLIO_BUCKET: &str = "portfolio-gallery-images";

const IMAGE_PREFIX: &str = "items";
const CACHE_KEY_LIST: &str = "portfolio:list";
const CACHE_PATTERN: &str = "portfolio:*";

pub struct PortfolioService {
    repo: Arc<dyn PortfolioRepository>,
    staging: Arc<StagingService>,
    cache: Arc<Cache>,
}

impl PortfolioService {
    pub fn new(repo: Arc<dyn PortfolioRepository>, staging: Arc<StagingService>, cache: Arc<Cache>) -> Self {
        Self { repo, staging, cache }
    }

    /// All items in gallery order
    pub async fn list(&self) -> Result<Vec<PortfolioItemView>, ServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<PortfolioItemView>>(CACHE_KEY_LIST).await {
            return Ok(cached);
        }
        let items: Vec<PortfolioItemView> = self
            .repo
            .list()
            .await
            .context("Failed to list portfolio items")?
            .into_iter()
            .map(|item| self.to_view(item))
            .collect();

        let _ = self.cache.set(CACHE_KEY_LIST, &items, self.cache.default_ttl()).await;
        Ok(items)
    }

    /// Add an item; without a sort order it goes to the end
    pub async fn create(&self, input: PortfolioItemInput) -> Result<PortfolioItemView, ServiceError> {
        let sort_order = match input.sort_order {
            Some(order) => order,
            None => self
                .repo
                .next_sort_order()
                .await
                .context("Failed to compute sort order")?,
        };
        let record = self.prepare(input, sort_order).await?;
        let item = self.repo.create(&record).await.map_err(ServiceError::db)?;

        self.invalidate().await;
        Ok(self.to_view(item))
    }

    /// Replace every field of an item; the sort order is kept when absent
    pub async fn update(&self, id: i64, input: PortfolioItemInput) -> Result<PortfolioItemView, ServiceError> {
        let existing = self.require(id).await?;
        let sort_order = input.sort_order.unwrap_or(existing.sort_order);
        let record = self.prepare(input, sort_order).await?;

        let item = self
            .repo
            .update(id, &record)
            .await
            .map_err(ServiceError::db)?
            .ok_or_else(|| ServiceError::not_found("Portfolio item"))?;

        self.staging
            .remove_superseded(PORTFOLIO_BUCKET, existing.image_path.as_deref(), item.image_path.as_deref())
            .await;
        self.invalidate().await;
        Ok(self.to_view(item))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let existing = self.require(id).await?;
        self.repo.delete(id).await.map_err(ServiceError::db)?;
        self.staging
            .remove_superseded(PORTFOLIO_BUCKET, existing.image_path.as_deref(), None)
            .await;
        self.invalidate().await;
        Ok(())
    }

    /// Replace the whole gallery with `inputs`, in the given order.
    ///
    /// Items without a sort order take their list position. Images no
    /// longer referenced afterwards are removed from the bucket.
    pub async fn replace_all(&self, inputs: Vec<PortfolioItemInput>) -> Result<Vec<PortfolioItemView>, ServiceError> {
        let previous = self.repo.list().await.context("Failed to list portfolio items")?;

        // Every item is checked before any staged image leaves staging
        let drafts = inputs
            .into_iter()
            .enumerate()
            .map(|(position, input)| {
                let sort_order = input.sort_order.unwrap_or(position as i32);
                validate(input, sort_order)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(drafts.len());
        for draft in drafts {
            records.push(self.commit(draft).await?);
        }

        let items = self.repo.replace_all(&records).await.map_err(ServiceError::db)?;

        let kept: HashSet<&str> = items.iter().filter_map(|i| i.image_path.as_deref()).collect();
        let orphaned: Vec<String> = previous
            .into_iter()
            .filter_map(|i| i.image_path)
            .filter(|path| !kept.contains(path.as_str()))
            .collect();
        if !orphaned.is_empty() {
            if let Err(e) = self.staging.store().remove(PORTFOLIO_BUCKET, &orphaned).await {
                tracing::warn!("Failed to remove replaced portfolio images: {}", e);
            }
        }

        tracing::info!("Replaced portfolio with {} item(s)", items.len());
        self.invalidate().await;
        Ok(items.into_iter().map(|item| self.to_view(item)).collect())
    }

    async fn require(&self, id: i64) -> Result<PortfolioItem, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get portfolio item")?
            .ok_or_else(|| ServiceError::not_found("Portfolio item"))
    }

    async fn prepare(&self, input: PortfolioItemInput, sort_order: i32) -> Result<PortfolioItemRecord, ServiceError> {
        self.commit(validate(input, sort_order)?).await
    }

    async fn commit(&self, draft: Draft) -> Result<PortfolioItemRecord, ServiceError> {
        let image_path = self
            .staging
            .commit_optional(draft.image.as_ref(), PORTFOLIO_BUCKET, IMAGE_PREFIX)
            .await?;
        Ok(PortfolioItemRecord { image_path, ..draft.record })
    }

    fn to_view(&self, item: PortfolioItem) -> PortfolioItemView {
        PortfolioItemView {
            image_url: item
                .image_path
                .as_deref()
                .map(|path| self.staging.public_url(PORTFOLIO_BUCKET, path)),
            item,
        }
    }

    async fn invalidate(&self) {
        let _ = self.cache.delete_pattern(CACHE_PATTERN).await;
    }
}

/// A checked item whose image has not been committed yet
struct Draft {
    record: PortfolioItemRecord,
    image: Option<ImageSlot>,
}

fn validate(input: PortfolioItemInput, sort_order: i32) -> Result<Draft, ServiceError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(ServiceError::validation("Title cannot be empty"));
    }
    Ok(Draft {
        record: PortfolioItemRecord {
            title,
            client: input.client.trim().to_string(),
            category: input.category.trim().to_string(),
            description: input.description,
            image_path: None,
            sort_order,
        },
        image: input.image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, StagingConfig, StorageConfig};
    use crate::db::repositories::SqlxPortfolioRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::storage::{DynObjectStore, LocalObjectStore};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<StagingService>, PortfolioService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store: DynObjectStore = Arc::new(LocalObjectStore::new(&storage));
        let staging = Arc::new(StagingService::new(&StagingConfig::default(), &storage, store));
        let service = PortfolioService::new(
            SqlxPortfolioRepository::boxed(pool),
            staging.clone(),
            crate::cache::create_cache(&CacheConfig::default()),
        );
        (dir, staging, service)
    }

    fn item(title: &str) -> PortfolioItemInput {
        PortfolioItemInput {
            title: title.to_string(),
            client: "Acme".to_string(),
            category: "Exhibition".to_string(),
            description: String::new(),
            image: None,
            sort_order: None,
        }
    }

    async fn staged_slot(staging: &StagingService) -> ImageSlot {
        staging
            .stage(PORTFOLIO_BUCKET, "work.webp", "image/webp", b"webp".to_vec())
            .await
            .unwrap()
            .slot()
    }

    #[tokio::test]
    async fn test_create_appends_in_order() {
        let (_dir, _staging, service) = setup().await;
        service.create(item("Stand A")).await.unwrap();
        service.create(item("Stand B")).await.unwrap();

        let items = service.list().await.unwrap();
        let titles: Vec<&str> = items.iter().map(|i| i.item.title.as_str()).collect();
        assert_eq!(titles, vec!["Stand A", "Stand B"]);
        assert!(items[0].item.sort_order < items[1].item.sort_order);
    }

    #[tokio::test]
    async fn test_update_keeps_sort_order_and_replaces_image() {
        let (_dir, staging, service) = setup().await;
        let mut input = item("Stand A");
        input.image = Some(staged_slot(&staging).await);
        let created = service.create(input).await.unwrap();
        let old_path = created.item.image_path.clone().unwrap();

        let mut input = item("Stand A (2025)");
        input.image = Some(staged_slot(&staging).await);
        let updated = service.update(created.item.id, input).await.unwrap();

        assert_eq!(updated.item.sort_order, created.item.sort_order);
        assert_ne!(updated.item.image_path.as_deref(), Some(old_path.as_str()));
        let stored = staging.store().list(PORTFOLIO_BUCKET, None).await.unwrap();
        assert_eq!(stored.len(), 1);

        assert!(matches!(service.update(999, item("x")).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_replace_all_uses_positions_and_drops_orphans() {
        let (_dir, staging, service) = setup().await;
        let mut first = item("Old");
        first.image = Some(staged_slot(&staging).await);
        let old = service.create(first).await.unwrap();
        let mut kept = item("Kept");
        kept.image = Some(staged_slot(&staging).await);
        let kept = service.create(kept).await.unwrap();

        let mut kept_again = item("Kept");
        kept_again.image = Some(ImageSlot::uploaded(kept.item.image_path.clone().unwrap()));
        let replaced = service
            .replace_all(vec![item("New first"), kept_again])
            .await
            .unwrap();

        assert_eq!(replaced.len(), 2);
        assert_eq!(replaced[0].item.title, "New first");
        assert_eq!(replaced[0].item.sort_order, 0);
        assert_eq!(replaced[1].item.sort_order, 1);

        let stored: Vec<String> = staging
            .store()
            .list(PORTFOLIO_BUCKET, None)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.path)
            .collect();
        assert_eq!(stored, vec![kept.item.image_path.unwrap()]);
        assert!(!stored.contains(&old.item.image_path.unwrap()));
    }

    #[tokio::test]
    async fn test_replace_all_rejects_invalid_item_without_changes() {
        let (_dir, _staging, service) = setup().await;
        service.create(item("Existing")).await.unwrap();

        let result = service.replace_all(vec![item("Fine"), item(" ")]).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_all_invalid_item_leaves_staged_images_alone() {
        let (_dir, staging, service) = setup().await;
        let slot = staged_slot(&staging).await;
        let token = match &slot {
            ImageSlot::Pending { token, .. } => token.clone(),
            other => panic!("expected pending slot, got {:?}", other),
        };

        let mut with_image = item("Stand A");
        with_image.image = Some(slot.clone());
        let result = service.replace_all(vec![with_image, item("")]).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        assert!(staging.store().list(PORTFOLIO_BUCKET, None).await.unwrap().is_empty());
        assert!(staging.preview(&token).await.is_some());

        // The same token still works once the list is fixed
        let mut with_image = item("Stand A");
        with_image.image = Some(slot);
        let replaced = service
            .replace_all(vec![with_image, item("Stand B")])
            .await
            .unwrap();
        assert!(replaced[0].item.image_path.is_some());
        assert_eq!(staging.store().list(PORTFOLIO_BUCKET, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, _staging, service) = setup().await;
        let created = service.create(item("Stand")).await.unwrap();
        service.delete(created.item.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
        assert!(matches!(service.delete(created.item.id).await, Err(ServiceError::NotFound(_))));
    }
}
