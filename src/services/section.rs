//! Section service
//!
//! Singleton page sections and their child items. A section that was never
//! saved reads as empty. Saving commits staged images into the section's
//! bucket and, when an item list is sent, replaces all items at once.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::SectionRepository;
use crate::models::{
    Section, SectionInput, SectionItem, SectionItemRecord, SectionItemView, SectionKey,
    SectionRecord, SectionView,
};
use crate::services::error::ServiceError;
use crate::services::staging::StagingService;
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

const CACHE_KEY_SECTION: &str = "sections:";
const CACHE_PATTERN: &str = "sections:*";

pub struct SectionService {
    repo: Arc<dyn SectionRepository>,
    staging: Arc<StagingService>,
    cache: Arc<Cache>,
}

impl SectionService {
    pub fn new(repo: Arc<dyn SectionRepository>, staging: Arc<StagingService>, cache: Arc<Cache>) -> Self {
        Self { repo, staging, cache }
    }

    /// Section record with its items in display order
    pub async fn get(&self, key: SectionKey) -> Result<SectionView, ServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_SECTION, key);
        if let Ok(Some(cached)) = self.cache.get::<SectionView>(&cache_key).await {
            return Ok(cached);
        }

        let section = self
            .repo
            .get(key.as_str())
            .await
            .context("Failed to get section")?;
        let items = self
            .repo
            .items(key.as_str())
            .await
            .context("Failed to list section items")?;
        let view = self.to_view(key, section, items);

        let _ = self.cache.set(&cache_key, &view, self.cache.default_ttl()).await;
        Ok(view)
    }

    /// Save a section. Items are replaced only when `input.items` is set.
    pub async fn save(&self, key: SectionKey, input: SectionInput) -> Result<SectionView, ServiceError> {
        let bucket = key.bucket();
        let previous = self
            .repo
            .get(key.as_str())
            .await
            .context("Failed to get section")?;
        let previous_items = self
            .repo
            .items(key.as_str())
            .await
            .context("Failed to list section items")?;

        if let Some(items) = &input.items {
            if items.iter().any(|item| item.title.trim().is_empty()) {
                return Err(ServiceError::validation("Item title cannot be empty"));
            }
        }

        let image_path = self
            .staging
            .commit_optional(input.image.as_ref(), bucket, key.as_str())
            .await?;
        let record = SectionRecord {
            title: input.title.trim().to_string(),
            subtitle: input.subtitle.trim().to_string(),
            body: input.body,
            image_path,
        };

        let item_records = match input.items {
            Some(items) => {
                let prefix = format!("{}/items", key);
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    records.push(SectionItemRecord {
                        title: item.title.trim().to_string(),
                        description: item.description,
                        icon: item.icon.filter(|i| !i.trim().is_empty()),
                        image_path: self
                            .staging
                            .commit_optional(item.image.as_ref(), bucket, &prefix)
                            .await?,
                    });
                }
                Some(records)
            }
            None => None,
        };

        let section = self
            .repo
            .save(key.as_str(), &record, item_records.as_deref())
            .await
            .map_err(ServiceError::db)?;

        self.staging
            .remove_superseded(
                bucket,
                previous.as_ref().and_then(|s| s.image_path.as_deref()),
                section.image_path.as_deref(),
            )
            .await;
        if let Some(records) = &item_records {
            let kept: HashSet<&str> = records.iter().filter_map(|r| r.image_path.as_deref()).collect();
            let orphaned: Vec<String> = previous_items
                .iter()
                .filter_map(|i| i.image_path.clone())
                .filter(|path| !kept.contains(path.as_str()))
                .collect();
            if !orphaned.is_empty() {
                if let Err(e) = self.staging.store().remove(bucket, &orphaned).await {
                    tracing::warn!("Failed to remove replaced images of section {}: {}", key, e);
                }
            }
        }

        tracing::info!("Saved section {}", key);
        let _ = self.cache.delete_pattern(CACHE_PATTERN).await;

        let items = self
            .repo
            .items(key.as_str())
            .await
            .context("Failed to list section items")?;
        Ok(self.to_view(key, Some(section), items))
    }

    fn to_view(&self, key: SectionKey, section: Option<Section>, items: Vec<SectionItem>) -> SectionView {
        let bucket = key.bucket();
        let url = |path: &str| self.staging.public_url(bucket, path);
        let items = items
            .into_iter()
            .map(|item| SectionItemView {
                image_url: item.image_path.as_deref().map(url),
                item,
            })
            .collect();

        match section {
            Some(section) => SectionView {
                key,
                image_url: section.image_path.as_deref().map(url),
                title: section.title,
                subtitle: section.subtitle,
                body: section.body,
                image_path: section.image_path,
                updated_at: Some(section.updated_at),
                items,
            },
            None => SectionView {
                key,
                title: String::new(),
                subtitle: String::new(),
                body: String::new(),
                image_path: None,
                image_url: None,
                updated_at: None,
                items,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, StagingConfig, StorageConfig};
    use crate::db::repositories::SqlxSectionRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::SectionItemInput;
    use crate::storage::{DynObjectStore, LocalObjectStore};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<StagingService>, SectionService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store: DynObjectStore = Arc::new(LocalObjectStore::new(&storage));
        let staging = Arc::new(StagingService::new(&StagingConfig::default(), &storage, store));
        let service = SectionService::new(
            SqlxSectionRepository::boxed(pool),
            staging.clone(),
            crate::cache::create_cache(&CacheConfig::default()),
        );
        (dir, staging, service)
    }

    fn input(title: &str, items: Option<Vec<&str>>) -> SectionInput {
        SectionInput {
            title: title.to_string(),
            subtitle: String::new(),
            body: "Body".to_string(),
            image: None,
            items: items.map(|titles| {
                titles
                    .into_iter()
                    .map(|t| SectionItemInput {
                        title: t.to_string(),
                        description: String::new(),
                        icon: None,
                        image: None,
                    })
                    .collect()
            }),
        }
    }

    #[tokio::test]
    async fn test_unsaved_section_is_empty() {
        let (_dir, _staging, service) = setup().await;
        let view = service.get(SectionKey::AboutDescription).await.unwrap();
        assert_eq!(view.key, SectionKey::AboutDescription);
        assert!(view.title.is_empty());
        assert!(view.updated_at.is_none());
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_save_invalidates_cached_read() {
        let (_dir, _staging, service) = setup().await;
        service.get(SectionKey::ConferenceManagement).await.unwrap();

        service
            .save(SectionKey::ConferenceManagement, input("Services", Some(vec!["Venues", "Logistics"])))
            .await
            .unwrap();

        let view = service.get(SectionKey::ConferenceManagement).await.unwrap();
        assert_eq!(view.title, "Services");
        let titles: Vec<&str> = view.items.iter().map(|i| i.item.title.as_str()).collect();
        assert_eq!(titles, vec!["Venues", "Logistics"]);
    }

    #[tokio::test]
    async fn test_items_kept_when_not_sent() {
        let (_dir, _staging, service) = setup().await;
        service
            .save(SectionKey::AboutDedication, input("Dedication", Some(vec!["Quality"])))
            .await
            .unwrap();
        let view = service
            .save(SectionKey::AboutDedication, input("Our dedication", None))
            .await
            .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.title, "Our dedication");
    }

    #[tokio::test]
    async fn test_empty_item_title_rejected() {
        let (_dir, _staging, service) = setup().await;
        let result = service
            .save(SectionKey::AboutDedication, input("Dedication", Some(vec!["ok", " "])))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_image_goes_to_section_bucket() {
        let (_dir, staging, service) = setup().await;
        let staged = staging
            .stage("conference-management", "hall.png", "image/png", b"png".to_vec())
            .await
            .unwrap();
        let mut form = input("Services", None);
        form.image = Some(staged.slot());

        let view = service.save(SectionKey::ConferenceManagement, form).await.unwrap();
        let path = view.image_path.unwrap();
        assert!(path.starts_with("conference_management/"));
        assert!(view.image_url.unwrap().contains("/storage/conference-management/"));

        let stored = staging.store().list("conference-management", None).await.unwrap();
        assert_eq!(stored.len(), 1);

        // Staged for another bucket.
        let staged = staging
            .stage("event-images", "x.png", "image/png", b"png".to_vec())
            .await
            .unwrap();
        let mut form = input("Services", None);
        form.image = Some(staged.slot());
        assert!(matches!(
            service.save(SectionKey::ConferenceManagement, form).await,
            Err(ServiceError::Staging(_))
        ));
    }
}
