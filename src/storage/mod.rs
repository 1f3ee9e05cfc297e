//! Object storage
//!
//! Images live in named buckets, addressed by a relative object path such
//! as `events/3f2a.jpg`. Every bucket has an upload policy (size limit and
//! allowed MIME types) taken from configuration. Stored objects are served
//! read-only under `/storage/<bucket>/<path>`.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use local::LocalObjectStore;

/// Metadata of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub size: u64,
    pub content_type: String,
    pub updated_at: DateTime<Utc>,
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bucket-scoped object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `bucket/path`. Without `upsert` an existing object
    /// is an error.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<StoredObject, StorageError>;

    /// Remove objects; paths that do not exist are skipped.
    /// Returns the paths actually removed.
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<Vec<String>, StorageError>;

    /// List objects, optionally below a folder prefix, sorted by path
    async fn list(&self, bucket: &str, prefix: Option<&str>)
        -> Result<Vec<StoredObject>, StorageError>;

    /// Public URL an object is served at
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Type alias for a shared object store
pub type DynObjectStore = Arc<dyn ObjectStore>;

static OBJECT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(/[A-Za-z0-9][A-Za-z0-9._-]*)*$")
        .expect("object path pattern is valid")
});

/// Check an object path: relative, `/`-separated, and no segment may start
/// with a dot, which rules out `..` traversal and hidden files.
pub fn validate_object_path(path: &str) -> Result<(), StorageError> {
    if path.len() > 512 || !OBJECT_PATH.is_match(path) {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Normalize a folder prefix given by a client: surrounding slashes are
/// dropped and the remainder must be a valid object path. Empty means the
/// bucket root.
pub fn normalize_prefix(prefix: &str) -> Result<Option<String>, StorageError> {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    validate_object_path(trimmed)?;
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_paths() {
        for path in ["a.png", "events/3f2a.jpg", "portfolio/2025/x_y-z.webp"] {
            assert!(validate_object_path(path).is_ok(), "{path}");
        }
    }

    #[test]
    fn test_invalid_paths() {
        for path in [
            "",
            "/etc/passwd",
            "../secret",
            "a/../b",
            "a//b",
            "a/",
            ".hidden",
            "a/.b",
            "a\\b",
            "with space.png",
        ] {
            assert!(validate_object_path(path).is_err(), "{path}");
        }
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("").unwrap(), None);
        assert_eq!(normalize_prefix("/").unwrap(), None);
        assert_eq!(normalize_prefix("/events/").unwrap().as_deref(), Some("events"));
        assert!(normalize_prefix("../x").is_err());
    }

    proptest! {
        #[test]
        fn accepted_paths_never_traverse(path in "[A-Za-z0-9./_-]{1,40}") {
            if validate_object_path(&path).is_ok() {
                prop_assert!(!path.starts_with('/'));
                prop_assert!(path.split('/').all(|seg| !seg.is_empty() && !seg.starts_with('.')));
            }
        }
    }
}
