//! Staged uploads
//!
//! An image picked in an editor form is held here until the form is saved.
//! Staging validates the file against the target bucket's policy and keeps
//! the bytes in memory; nothing reaches the object store until
//! [`StagingService::commit`] runs as part of the record save. Abandoned
//! files expire after the configured TTL, and the total size of staged
//! files is capped by a byte budget.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{extension_for_mime, normalize_content_type, BucketConfig, StagingConfig, StorageConfig};
use crate::models::ImageSlot;
use crate::storage::{normalize_prefix, validate_object_path, DynObjectStore, StorageError};

/// Route prefix previews are served under
pub const PREVIEW_ROUTE: &str = "/api/admin/staging";

/// Staging errors
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    /// Rejected by the bucket policy
    #[error("{0}")]
    Rejected(String),

    /// Unknown, discarded or expired token
    #[error("Staged upload not found or expired: {0}")]
    NotFound(String),

    #[error("Staged upload {token} belongs to bucket {staged}, not {requested}")]
    BucketMismatch {
        token: String,
        staged: String,
        requested: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A file held in staging
#[derive(Debug)]
pub struct StagedFile {
    pub bucket: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub staged_at: DateTime<Utc>,
}

/// Receipt returned to the editor after staging a file
#[derive(Debug, Clone, Serialize)]
pub struct PendingUpload {
    pub token: String,
    pub preview_url: String,
    pub bucket: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

impl PendingUpload {
    /// Slot to put into the form until it is saved
    pub fn slot(&self) -> ImageSlot {
        ImageSlot::Pending {
            token: self.token.clone(),
            preview_url: self.preview_url.clone(),
        }
    }
}

/// Staging area for deferred image uploads
pub struct StagingService {
    staged: Cache<String, Arc<StagedFile>>,
    buckets: Vec<BucketConfig>,
    store: DynObjectStore,
}

impl StagingService {
    pub fn new(config: &StagingConfig, storage: &StorageConfig, store: DynObjectStore) -> Self {
        // Weighted by file size, so the capacity is a byte budget
        let staged = Cache::builder()
            .weigher(|_token: &String, file: &Arc<StagedFile>| -> u32 {
                file.data.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(config.max_bytes)
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();
        Self {
            staged,
            buckets: storage.buckets.clone(),
            store,
        }
    }

    fn policy(&self, bucket: &str) -> Result<&BucketConfig, StagingError> {
        self.buckets
            .iter()
            .find(|b| b.name == bucket)
            .ok_or_else(|| StagingError::UnknownBucket(bucket.to_string()))
    }

    /// Validate and hold a file for a later save.
    ///
    /// A missing or generic content type is guessed from the file name.
    pub async fn stage(
        &self,
        bucket: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<PendingUpload, StagingError> {
        let policy = self.policy(bucket)?;

        let content_type = normalize_content_type(content_type, filename);
        policy
            .check(&content_type, data.len() as u64)
            .map_err(StagingError::Rejected)?;

        let token = Uuid::new_v4().to_string();
        let size = data.len() as u64;
        let file = StagedFile {
            bucket: bucket.to_string(),
            filename: filename.to_string(),
            content_type: content_type.clone(),
            data,
            staged_at: Utc::now(),
        };
        self.staged.insert(token.clone(), Arc::new(file)).await;

        tracing::debug!("Staged {} ({} bytes) for bucket {}", filename, size, bucket);

        Ok(PendingUpload {
            preview_url: format!("{}/{}", PREVIEW_ROUTE, token),
            token,
            bucket: bucket.to_string(),
            filename: filename.to_string(),
            content_type,
            size,
        })
    }

    /// Staged file for previewing
    pub async fn preview(&self, token: &str) -> Option<Arc<StagedFile>> {
        self.staged.get(token).await
    }

    /// Bytes currently held in staging
    pub async fn staged_bytes(&self) -> u64 {
        self.staged.run_pending_tasks().await;
        self.staged.weighted_size()
    }

    /// Drop a staged file. Returns false when the token was unknown.
    pub async fn discard(&self, token: &str) -> bool {
        self.staged.remove(token).await.is_some()
    }

    /// Resolve an image slot to a stored object path.
    ///
    /// Uploaded slots pass through. Pending slots are uploaded to
    /// `bucket/prefix/<uuid>.<ext>` and leave staging. If the caller's save
    /// fails afterwards the object stays in the bucket.
    pub async fn commit(
        &self,
        slot: &ImageSlot,
        bucket: &str,
        prefix: &str,
    ) -> Result<String, StagingError> {
        match slot {
            ImageSlot::Uploaded { path } => {
                validate_object_path(path)?;
                Ok(path.clone())
            }
            ImageSlot::Pending { token, .. } => {
                let file = self
                    .staged
                    .get(token)
                    .await
                    .ok_or_else(|| StagingError::NotFound(token.clone()))?;
                if file.bucket != bucket {
                    return Err(StagingError::BucketMismatch {
                        token: token.clone(),
                        staged: file.bucket.clone(),
                        requested: bucket.to_string(),
                    });
                }

                let name = format!("{}.{}", Uuid::new_v4(), extension_for_mime(&file.content_type));
                let path = match normalize_prefix(prefix)? {
                    Some(prefix) => format!("{}/{}", prefix, name),
                    None => name,
                };
                self.store
                    .upload(bucket, &path, &file.data, &file.content_type, false)
                    .await?;
                self.staged.remove(token).await;

                tracing::info!("Committed staged upload {} to {}/{}", file.filename, bucket, path);
                Ok(path)
            }
        }
    }

    /// [`commit`](Self::commit) for an optional slot
    pub async fn commit_optional(
        &self,
        slot: Option<&ImageSlot>,
        bucket: &str,
        prefix: &str,
    ) -> Result<Option<String>, StagingError> {
        match slot {
            Some(slot) => self.commit(slot, bucket, prefix).await.map(Some),
            None => Ok(None),
        }
    }

    /// Remove an object replaced by a save. Failures are logged only.
    pub async fn remove_superseded(&self, bucket: &str, old: Option<&str>, new: Option<&str>) {
        let Some(old) = old else { return };
        if Some(old) == new {
            return;
        }
        if let Err(e) = self.store.remove(bucket, &[old.to_string()]).await {
            tracing::warn!("Failed to remove superseded object {}/{}: {}", bucket, old, e);
        }
    }

    /// Public URL of a stored object
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.store.public_url(bucket, path)
    }

    /// Shared object store
    pub fn store(&self) -> &DynObjectStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalObjectStore;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    fn setup() -> (TempDir, StagingService) {
        setup_with(&StagingConfig::default())
    }

    fn setup_with(config: &StagingConfig) -> (TempDir, StagingService) {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store: DynObjectStore = Arc::new(LocalObjectStore::new(&storage));
        let service = StagingService::new(config, &storage, store);
        (dir, service)
    }

    #[tokio::test]
    async fn test_stage_does_not_touch_store() {
        let (_dir, service) = setup();
        let pending = service
            .stage("event-images", "cover.png", "image/png", PNG.to_vec())
            .await
            .unwrap();

        assert_eq!(pending.preview_url, format!("/api/admin/staging/{}", pending.token));
        assert_eq!(pending.size, PNG.len() as u64);
        assert!(service.store().list("event-images", None).await.unwrap().is_empty());

        let preview = service.preview(&pending.token).await.unwrap();
        assert_eq!(preview.data, PNG);
        assert_eq!(preview.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_stage_rejects_by_policy() {
        let (_dir, service) = setup();
        let err = service
            .stage("event-images", "notes.pdf", "application/pdf", vec![1])
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::Rejected(msg) if msg.starts_with("Invalid file type")));

        let too_big = vec![0u8; 10 * 1024 * 1024 + 1];
        let err = service
            .stage("event-images", "big.jpg", "image/jpeg", too_big)
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::Rejected(msg) if msg.starts_with("File too large")));

        let err = service.stage("nope", "a.png", "image/png", vec![1]).await.unwrap_err();
        assert!(matches!(err, StagingError::UnknownBucket(_)));
    }

    #[tokio::test]
    async fn test_content_type_guessed_from_filename() {
        let (_dir, service) = setup();
        let pending = service
            .stage("blog-images", "photo.JPG", "application/octet-stream", vec![1, 2])
            .await
            .unwrap();
        assert_eq!(pending.content_type, "image/jpeg");

        // Declared types are compared case-insensitively
        let pending = service
            .stage("blog-images", "photo.png", "image/PNG", vec![1, 2])
            .await
            .unwrap();
        assert_eq!(pending.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_byte_budget_evicts_oldest() {
        let file = vec![7u8; 1024];
        let config = StagingConfig {
            max_bytes: 2 * 1024,
            ..Default::default()
        };
        let (_dir, service) = setup_with(&config);

        let mut tokens = Vec::new();
        for name in ["a.png", "b.png", "c.png"] {
            let pending = service
                .stage("event-images", name, "image/png", file.clone())
                .await
                .unwrap();
            tokens.push(pending.token);
        }

        assert!(service.staged_bytes().await <= 2 * 1024);
        assert!(service.preview(&tokens[0]).await.is_none());
        assert!(service.preview(&tokens[2]).await.is_some());
    }

    #[tokio::test]
    async fn test_commit_uploads_and_consumes_token() {
        let (_dir, service) = setup();
        let pending = service
            .stage("event-images", "cover.png", "image/png", PNG.to_vec())
            .await
            .unwrap();

        let path = service.commit(&pending.slot(), "event-images", "covers").await.unwrap();
        assert!(path.starts_with("covers/"));
        assert!(path.ends_with(".png"));

        let listed = service.store().list("event-images", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, path);

        assert!(service.preview(&pending.token).await.is_none());
        let err = service.commit(&pending.slot(), "event-images", "covers").await.unwrap_err();
        assert!(matches!(err, StagingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_rejects_other_bucket() {
        let (_dir, service) = setup();
        let pending = service
            .stage("blog-images", "cover.png", "image/png", PNG.to_vec())
            .await
            .unwrap();
        let err = service.commit(&pending.slot(), "event-images", "").await.unwrap_err();
        assert!(matches!(err, StagingError::BucketMismatch { .. }));
        assert!(service.preview(&pending.token).await.is_some());
    }

    #[tokio::test]
    async fn test_uploaded_slot_passes_through() {
        let (_dir, service) = setup();
        let slot = ImageSlot::uploaded("covers/existing.png");
        assert_eq!(service.commit(&slot, "event-images", "x").await.unwrap(), "covers/existing.png");

        let slot = ImageSlot::uploaded("../escape.png");
        assert!(matches!(
            service.commit(&slot, "event-images", "").await,
            Err(StagingError::Storage(StorageError::InvalidPath(_)))
        ));
        assert_eq!(service.commit_optional(None, "event-images", "").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_discard_and_remove_superseded() {
        let (_dir, service) = setup();
        let pending = service
            .stage("event-images", "a.png", "image/png", PNG.to_vec())
            .await
            .unwrap();
        assert!(service.discard(&pending.token).await);
        assert!(!service.discard(&pending.token).await);

        let pending = service
            .stage("event-images", "a.png", "image/png", PNG.to_vec())
            .await
            .unwrap();
        let old = service.commit(&pending.slot(), "event-images", "").await.unwrap();

        service.remove_superseded("event-images", Some(&old), Some(&old)).await;
        assert_eq!(service.store().list("event-images", None).await.unwrap().len(), 1);

        service.remove_superseded("event-images", Some(&old), None).await;
        assert!(service.store().list("event-images", None).await.unwrap().is_empty());
    }
}
