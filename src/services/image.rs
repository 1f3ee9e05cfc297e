//! Image library
//!
//! Direct bucket access for the admin media screen: list, upload and remove
//! objects without going through a record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{extension_for_mime, normalize_content_type};
use crate::services::error::ServiceError;
use crate::storage::{normalize_prefix, DynObjectStore, StoredObject};

/// Stored object with its public URL
#[derive(Debug, Clone, Serialize)]
pub struct ImageObject {
    #[serde(flatten)]
    pub object: StoredObject,
    pub url: String,
}

/// Request to delete objects from a bucket
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveImagesInput {
    pub bucket: String,
    pub paths: Vec<String>,
}

pub struct ImageService {
    store: DynObjectStore,
}

impl ImageService {
    pub fn new(store: DynObjectStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ImageObject>, ServiceError> {
        let objects = self.store.list(bucket, prefix).await?;
        Ok(objects.into_iter().map(|o| self.with_url(o)).collect())
    }

    /// Store a file under `prefix/<uuid>.<ext>`
    pub async fn upload(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<ImageObject, ServiceError> {
        let content_type = normalize_content_type(content_type, filename);
        let content_type = content_type.as_str();
        let name = format!("{}.{}", Uuid::new_v4(), extension_for_mime(content_type));
        let path = match prefix.map(normalize_prefix).transpose()?.flatten() {
            Some(prefix) => format!("{}/{}", prefix, name),
            None => name,
        };
        let object = self.store.upload(bucket, &path, data, content_type, false).await?;
        tracing::info!("Uploaded {}/{} ({} bytes)", bucket, path, object.size);
        Ok(self.with_url(object))
    }

    /// Remove objects, returning the paths that existed
    pub async fn remove(&self, input: &RemoveImagesInput) -> Result<Vec<String>, ServiceError> {
        if input.paths.is_empty() {
            return Err(ServiceError::validation("No paths given"));
        }
        let removed = self.store.remove(&input.bucket, &input.paths).await?;
        tracing::info!("Removed {} object(s) from {}", removed.len(), input.bucket);
        Ok(removed)
    }

    fn with_url(&self, object: StoredObject) -> ImageObject {
        ImageObject {
            url: self.store.public_url(&object.bucket, &object.path),
            object,
        }
    }
}
