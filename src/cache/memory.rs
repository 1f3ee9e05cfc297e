//! In-memory cache implementation using moka
//!
//! Values are stored as JSON so any serializable type can be cached.
//! Expiry uses the cache-wide TTL; entries never outlive it.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// In-memory cache using moka
pub struct MemoryCache {
    cache: Cache<String, Arc<String>>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a cache holding at most `max_capacity` entries for `default_ttl`
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(default_ttl)
            .support_invalidation_closures()
            .build();

        Self { cache, default_ttl }
    }

    /// Default TTL for this cache
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Glob match supporting `*` (any run) and `?` (one character)
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        let pattern: Vec<char> = pattern.chars().collect();
        let key: Vec<char> = key.chars().collect();

        // Iterative matcher with single-star backtracking.
        let (mut p, mut k) = (0, 0);
        let mut star: Option<(usize, usize)> = None;
        while k < key.len() {
            if p < pattern.len() && (pattern[p] == '?' || pattern[p] == key[k]) {
                p += 1;
                k += 1;
            } else if p < pattern.len() && pattern[p] == '*' {
                star = Some((p, k));
                p += 1;
            } else if let Some((sp, sk)) = star {
                p = sp + 1;
                k = sk + 1;
                star = Some((sp, sk + 1));
            } else {
                return false;
            }
        }
        pattern[p..].iter().all(|c| *c == '*')
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Failed to deserialize cache value")?,
            )),
            None => Ok(None),
        }
    }

    /// Insert a value. `ttl` is capped by the cache-wide TTL.
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, _ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        self.cache.insert(key.to_string(), Arc::new(json)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let pattern = pattern.to_string();
        self.cache
            .invalidate_entries_if(move |key, _| Self::pattern_matches(&pattern, key))
            .map_err(|e| anyhow::anyhow!("Failed to invalidate cache entries: {}", e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cache() -> MemoryCache {
        MemoryCache::with_capacity_and_ttl(100, Duration::from_secs(60))
    }

    #[test]
    fn test_pattern_matches() {
        assert!(MemoryCache::pattern_matches("events:*", "events:list:1"));
        assert!(MemoryCache::pattern_matches("events:*", "events:"));
        assert!(MemoryCache::pattern_matches("sections:?", "sections:a"));
        assert!(MemoryCache::pattern_matches("*:related:*", "events:related:7"));
        assert!(!MemoryCache::pattern_matches("events:*", "sections:about"));
        assert!(!MemoryCache::pattern_matches("sections:?", "sections:ab"));
    }

    #[tokio::test]
    async fn test_delete_pattern_only_hits_matches() {
        let cache = cache();
        let ttl = Duration::from_secs(60);
        cache.set("events:list", &"a", ttl).await.unwrap();
        cache.set("events:slug:expo", &"b", ttl).await.unwrap();
        cache.set("sections:about_dedication", &"c", ttl).await.unwrap();

        cache.delete_pattern("events:*").await.unwrap();
        // Invalidation closures run lazily; reads already honour them.
        assert_eq!(cache.get::<String>("events:list").await.unwrap(), None);
        assert_eq!(cache.get::<String>("events:slug:expo").await.unwrap(), None);
        assert_eq!(
            cache.get::<String>("sections:about_dedication").await.unwrap().as_deref(),
            Some("c")
        );
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = cache();
        let ttl = Duration::from_secs(60);
        cache.set("a", &1, ttl).await.unwrap();
        cache.set("b", &2, ttl).await.unwrap();

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get::<i32>("a").await.unwrap(), None);

        cache.clear().await.unwrap();
        assert_eq!(cache.get::<i32>("b").await.unwrap(), None);
    }

    proptest! {
        #[test]
        fn star_matches_any_suffix(prefix in "[a-z]{1,8}", rest in "[a-z:0-9]{0,12}") {
            let pattern = format!("{}:*", prefix);
            let key = format!("{}:{}", prefix, rest);
            prop_assert!(MemoryCache::pattern_matches(&pattern, &key));
        }

        #[test]
        fn literal_pattern_matches_only_itself(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            prop_assert_eq!(MemoryCache::pattern_matches(&a, &b), a == b);
        }
    }
}
