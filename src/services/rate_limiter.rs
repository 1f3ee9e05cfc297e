//! Login throttling
//!
//! Sliding windows over recent attempts:
//! - failed logins per username (5 per 15 minutes)
//! - login requests per client address (10 per minute)

use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

const USERNAME_LIMIT: usize = 5;
const USERNAME_WINDOW: Duration = Duration::from_secs(15 * 60);
const ADDRESS_LIMIT: usize = 10;
const ADDRESS_WINDOW: Duration = Duration::from_secs(60);

/// A login refused before the password was checked
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Throttled {
    #[error("Too many login requests, try again later")]
    Address { retry_after: u64 },

    #[error("Too many failed logins, try again in 15 minutes")]
    Username { retry_after: u64 },
}

impl Throttled {
    /// Seconds until the window has room again
    pub fn retry_after(&self) -> u64 {
        match self {
            Throttled::Address { retry_after } | Throttled::Username { retry_after } => *retry_after,
        }
    }
}

/// Timestamps of recent attempts per key
struct Window<K> {
    limit: usize,
    span: Duration,
    attempts: RwLock<HashMap<K, Vec<Instant>>>,
}

impl<K: Eq + Hash> Window<K> {
    fn new(limit: usize, span: Duration) -> Self {
        Self {
            limit,
            span,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Seconds to wait when `key` is at its limit
    async fn blocked(&self, key: &K) -> Option<u64> {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        let times = attempts.get_mut(key)?;
        times.retain(|t| now.duration_since(*t) < self.span);
        if times.len() < self.limit {
            return None;
        }
        let oldest = times.iter().min().copied().unwrap_or(now);
        let wait = self.span.saturating_sub(now.duration_since(oldest));
        Some(wait.as_secs().max(1))
    }

    async fn record(&self, key: K) {
        self.attempts
            .write()
            .await
            .entry(key)
            .or_default()
            .push(Instant::now());
    }

    async fn clear(&self, key: &K) {
        self.attempts.write().await.remove(key);
    }

    async fn prune(&self) {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, times| {
            times.retain(|t| now.duration_since(*t) < self.span);
            !times.is_empty()
        });
    }

    async fn len(&self) -> usize {
        self.attempts.read().await.len()
    }
}

/// Login rate limiter shared by the login handler
pub struct LoginRateLimiter {
    usernames: Window<String>,
    addresses: Window<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            usernames: Window::new(USERNAME_LIMIT, USERNAME_WINDOW),
            addresses: Window::new(ADDRESS_LIMIT, ADDRESS_WINDOW),
        }
    }

    /// Count a login request from `ip`, refusing it when the address is
    /// over its limit. Refused requests are not counted.
    pub async fn check_address(&self, ip: IpAddr) -> Result<(), Throttled> {
        if let Some(retry_after) = self.addresses.blocked(&ip).await {
            tracing::warn!("Login requests from {} throttled", ip);
            return Err(Throttled::Address { retry_after });
        }
        self.addresses.record(ip).await;
        Ok(())
    }

    /// Refuse a login for a username with too many recent failures
    pub async fn check_username(&self, username: &str) -> Result<(), Throttled> {
        match self.usernames.blocked(&username_key(username)).await {
            Some(retry_after) => {
                tracing::warn!("Logins for '{}' throttled", username);
                Err(Throttled::Username { retry_after })
            }
            None => Ok(()),
        }
    }

    pub async fn record_failure(&self, username: &str) {
        self.usernames.record(username_key(username)).await;
    }

    /// Forget failures after a successful login
    pub async fn clear(&self, username: &str) {
        self.usernames.clear(&username_key(username)).await;
    }

    /// Drop expired attempts; run periodically
    pub async fn cleanup(&self) {
        self.usernames.prune().await;
        self.addresses.prune().await;
    }

    /// Number of usernames and addresses currently tracked
    pub async fn tracked(&self) -> usize {
        self.usernames.len().await + self.addresses.len().await
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_username_limit_and_window() {
        let limiter = LoginRateLimiter::new();
        for _ in 0..USERNAME_LIMIT {
            assert_eq!(limiter.check_username("admin").await, Ok(()));
            limiter.record_failure("admin").await;
        }

        let err = limiter.check_username("admin").await.unwrap_err();
        assert_eq!(err.retry_after(), 15 * 60);

        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        assert_eq!(limiter.check_username("admin").await.unwrap_err().retry_after(), 5 * 60);

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert_eq!(limiter.check_username("admin").await, Ok(()));
    }

    #[tokio::test]
    async fn test_username_case_and_clear() {
        let limiter = LoginRateLimiter::new();
        for name in ["Admin", "admin", " ADMIN ", "aDmin", "admin"] {
            limiter.record_failure(name).await;
        }
        assert!(matches!(
            limiter.check_username("ADMIN").await,
            Err(Throttled::Username { .. })
        ));
        assert_eq!(limiter.check_username("editor").await, Ok(()));

        limiter.clear("Admin").await;
        assert_eq!(limiter.check_username("admin").await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_address_limit() {
        let limiter = LoginRateLimiter::new();
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        for _ in 0..ADDRESS_LIMIT {
            assert_eq!(limiter.check_address(ip).await, Ok(()));
        }
        assert!(matches!(limiter.check_address(ip).await, Err(Throttled::Address { .. })));

        let other: IpAddr = "203.0.113.8".parse().unwrap();
        assert_eq!(limiter.check_address(other).await, Ok(()));

        tokio::time::advance(ADDRESS_WINDOW).await;
        assert_eq!(limiter.check_address(ip).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_expired() {
        let limiter = LoginRateLimiter::new();
        limiter.record_failure("admin").await;
        limiter.check_address("198.51.100.1".parse().unwrap()).await.unwrap();
        assert_eq!(limiter.tracked().await, 2);

        tokio::time::advance(ADDRESS_WINDOW).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked().await, 1);

        tokio::time::advance(USERNAME_WINDOW).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked().await, 0);
    }
}
