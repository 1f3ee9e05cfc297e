//! Filesystem-backed object store
//!
//! Each bucket is a directory below the storage root. Content types are not
//! persisted; they are derived from the file extension when listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{validate_object_path, normalize_prefix, ObjectStore, StorageError, StoredObject};
use crate::config::{mime_for_extension, BucketConfig, StorageConfig};

/// Object store on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    buckets: Vec<BucketConfig>,
}

impl LocalObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.path.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            buckets: config.buckets.clone(),
        }
    }

    /// Create the root and one directory per configured bucket
    pub async fn ensure_buckets(&self) -> Result<(), StorageError> {
        for bucket in &self.buckets {
            fs::create_dir_all(self.root.join(&bucket.name)).await?;
        }
        Ok(())
    }

    /// Directory served at `/storage`
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket(&self, name: &str) -> Result<&BucketConfig, StorageError> {
        self.buckets
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| StorageError::UnknownBucket(name.to_string()))
    }

    fn object_file(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        self.bucket(bucket)?;
        validate_object_path(path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<StoredObject, StorageError> {
        let policy = self.bucket(bucket)?;
        policy
            .check(content_type, data.len() as u64)
            .map_err(StorageError::Rejected)?;

        let file_path = self.object_file(bucket, path)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true);
        if upsert {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = match options.open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(format!("{}/{}", bucket, path)));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data).await?;
        file.flush().await?;

        tracing::debug!("Stored {}/{} ({} bytes)", bucket, path, data.len());

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            updated_at: Utc::now(),
        })
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<Vec<String>, StorageError> {
        let mut removed = Vec::new();
        for path in paths {
            let file_path = self.object_file(bucket, path)?;
            match fs::remove_file(&file_path).await {
                Ok(()) => removed.push(path.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if !removed.is_empty() {
            tracing::debug!("Removed {} object(s) from {}", removed.len(), bucket);
        }
        Ok(removed)
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<StoredObject>, StorageError> {
        self.bucket(bucket)?;
        let bucket_dir = self.root.join(bucket);
        let start = match prefix.map(normalize_prefix).transpose()?.flatten() {
            Some(prefix) => bucket_dir.join(prefix),
            None => bucket_dir.clone(),
        };

        let mut objects = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                let entry_path = entry.path();
                if metadata.is_dir() {
                    pending.push(entry_path);
                    continue;
                }
                let Ok(relative) = entry_path.strip_prefix(&bucket_dir) else {
                    continue;
                };
                let path = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if validate_object_path(&path).is_err() {
                    continue;
                }
                let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
                objects.push(StoredObject {
                    bucket: bucket.to_string(),
                    content_type: mime_for_extension(ext).to_string(),
                    size: metadata.len(),
                    updated_at: metadata
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now()),
                    path,
                });
            }
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        let encoded = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/storage/{}/{}", self.public_base_url, bucket, encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalObjectStore {
        let config = StorageConfig {
            path: dir.path().to_path_buf(),
            public_base_url: "https://cdn.example.com/".to_string(),
            buckets: vec![
                BucketConfig::new("event-images", 1024),
                BucketConfig::new("about-dedication", 1024),
            ],
        };
        LocalObjectStore::new(&config)
    }

    #[tokio::test]
    async fn test_upload_list_remove() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.ensure_buckets().await.unwrap();

        store
            .upload("event-images", "events/b.png", b"png", "image/png", false)
            .await
            .unwrap();
        store
            .upload("event-images", "a.jpg", b"jpeg", "image/jpeg", false)
            .await
            .unwrap();

        let all = store.list("event-images", None).await.unwrap();
        assert_eq!(
            all.iter().map(|o| o.path.as_str()).collect::<Vec<_>>(),
            vec!["a.jpg", "events/b.png"]
        );
        assert_eq!(all[1].content_type, "image/png");
        assert_eq!(all[1].size, 3);

        let scoped = store.list("event-images", Some("/events/")).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert!(store.list("about-dedication", None).await.unwrap().is_empty());

        let removed = store
            .remove("event-images", &["a.jpg".to_string(), "missing.png".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, vec!["a.jpg".to_string()]);
        assert_eq!(store.list("event-images", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_semantics() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.upload("event-images", "x.png", b"1", "image/png", false).await.unwrap();
        let err = store
            .upload("event-images", "x.png", b"2", "image/png", false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        store.upload("event-images", "x.png", b"22", "image/png", true).await.unwrap();
        let bytes = std::fs::read(dir.path().join("event-images/x.png")).unwrap();
        assert_eq!(bytes, b"22");
    }

    #[tokio::test]
    async fn test_policy_and_path_checks() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let too_big = vec![0u8; 1025];
        assert!(matches!(
            store.upload("event-images", "big.png", &too_big, "image/png", false).await,
            Err(StorageError::Rejected(_))
        ));
        assert!(matches!(
            store.upload("event-images", "doc.pdf", b"x", "application/pdf", false).await,
            Err(StorageError::Rejected(_))
        ));
        assert!(matches!(
            store.upload("nope", "a.png", b"x", "image/png", false).await,
            Err(StorageError::UnknownBucket(_))
        ));
        assert!(matches!(
            store.upload("event-images", "../a.png", b"x", "image/png", false).await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(
            store.public_url("event-images", "events/a b.png"),
            "https://cdn.example.com/storage/event-images/events/a%20b.png"
        );
    }
}
