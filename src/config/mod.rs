//! Configuration management
//!
//! This module handles loading and parsing configuration for Showfloor.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Read cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Staged (deferred) upload configuration
    #[serde(default)]
    pub staging: StagingConfig,
    /// Admin notification banner configuration
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Admin account and session configuration
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the admin panel, which sends the session cookie)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/showfloor.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Read cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory; every bucket is a sub-directory
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Prefix prepended to `/storage/<bucket>/<path>` in public URLs
    #[serde(default)]
    pub public_base_url: String,
    /// Known buckets and their upload policies
    #[serde(default = "default_buckets")]
    pub buckets: Vec<BucketConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            public_base_url: String::new(),
            buckets: default_buckets(),
        }
    }
}

impl StorageConfig {
    /// Look up a bucket policy by name
    pub fn bucket(&self, name: &str) -> Option<&BucketConfig> {
        self.buckets.iter().find(|b| b.name == name)
    }

    /// Largest file size accepted by any bucket
    pub fn max_file_size(&self) -> u64 {
        self.buckets
            .iter()
            .map(|b| b.max_file_size)
            .max()
            .unwrap_or_else(default_max_file_size)
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("storage")
}

/// Upload policy for a single bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Bucket name, e.g. `portfolio-gallery-images`
    pub name: String,
    /// Maximum file size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl BucketConfig {
    /// Create a bucket policy with the default image allow-list
    pub fn new(name: impl Into<String>, max_file_size: u64) -> Self {
        Self {
            name: name.into(),
            max_file_size,
            allowed_types: default_allowed_types(),
        }
    }

    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(mime_type))
    }

    /// Validate a candidate upload against this policy
    pub fn check(&self, content_type: &str, size: u64) -> Result<(), String> {
        if !self.is_type_allowed(content_type) {
            return Err(format!(
                "Invalid file type: {}. Allowed types: {}",
                content_type,
                self.allowed_types.join(", ")
            ));
        }
        if size > self.max_file_size {
            return Err(format!(
                "File too large. Maximum size: {} MB",
                self.max_file_size / 1024 / 1024
            ));
        }
        Ok(())
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
    ]
}

fn default_buckets() -> Vec<BucketConfig> {
    const MB: u64 = 1024 * 1024;
    vec![
        BucketConfig::new("about-dedication", 10 * MB),
        BucketConfig::new("conference-management", 10 * MB),
        BucketConfig::new("event-images", 10 * MB),
        BucketConfig::new("blog-images", 10 * MB),
        BucketConfig::new("company-assets", 10 * MB),
        BucketConfig::new("portfolio-gallery-images", 50 * MB),
    ]
}

/// File extension for an image MIME type
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/x-icon" => "ico",
        _ => "bin",
    }
}

/// MIME type guessed from a file extension
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Content type of an upload, as compared against bucket policies.
///
/// A missing or generic type is guessed from the file name; anything else
/// is trimmed and lowercased.
pub fn normalize_content_type(content_type: &str, filename: &str) -> String {
    let content_type = content_type.trim().to_ascii_lowercase();
    if content_type.is_empty() || content_type == "application/octet-stream" {
        let ext = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
        mime_for_extension(ext).to_string()
    } else {
        content_type
    }
}

/// Staged upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// How long a staged file waits for the form save, in seconds
    #[serde(default = "default_staging_ttl")]
    pub ttl_seconds: u64,
    /// Total bytes of staged files held at once; the least recently
    /// used files are evicted beyond it
    #[serde(default = "default_staging_max_bytes")]
    pub max_bytes: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_staging_ttl(),
            max_bytes: default_staging_max_bytes(),
        }
    }
}

fn default_staging_ttl() -> u64 {
    3600
}

fn default_staging_max_bytes() -> u64 {
    256 * 1024 * 1024 // 256MB
}

/// Notification banner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Auto-dismiss delay in milliseconds
    #[serde(default = "default_dismiss_after_ms")]
    pub dismiss_after_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dismiss_after_ms: default_dismiss_after_ms(),
        }
    }
}

fn default_dismiss_after_ms() -> u64 {
    5000
}

/// Admin account bootstrap and session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Username of the account created when the users table is empty
    #[serde(default = "default_admin_username")]
    pub username: String,
    /// Email of the bootstrap account
    #[serde(default = "default_admin_email")]
    pub email: String,
    /// Password of the bootstrap account; no account is created when unset
    #[serde(default)]
    pub password: Option<String>,
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            email: default_admin_email(),
            password: None,
            session_days: default_session_days(),
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@localhost".to_string()
}

fn default_session_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - SHOWFLOOR_SERVER_HOST
    /// - SHOWFLOOR_SERVER_PORT
    /// - SHOWFLOOR_SERVER_CORS_ORIGIN
    /// - SHOWFLOOR_DATABASE_DRIVER
    /// - SHOWFLOOR_DATABASE_URL
    /// - SHOWFLOOR_CACHE_TTL_SECONDS
    /// - SHOWFLOOR_STORAGE_PATH
    /// - SHOWFLOOR_STORAGE_PUBLIC_BASE_URL
    /// - SHOWFLOOR_ADMIN_USERNAME
    /// - SHOWFLOOR_ADMIN_PASSWORD
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SHOWFLOOR_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SHOWFLOOR_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SHOWFLOOR_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("SHOWFLOOR_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SHOWFLOOR_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("SHOWFLOOR_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(path) = std::env::var("SHOWFLOOR_STORAGE_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Ok(base) = std::env::var("SHOWFLOOR_STORAGE_PUBLIC_BASE_URL") {
            self.storage.public_base_url = base;
        }

        if let Ok(username) = std::env::var("SHOWFLOOR_ADMIN_USERNAME") {
            self.admin.username = username;
        }
        if let Ok(password) = std::env::var("SHOWFLOOR_ADMIN_PASSWORD") {
            if !password.is_empty() {
                self.admin.password = Some(password);
            }
        }
    }

    /// Reject configurations that would fail later at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.buckets.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.buckets must declare at least one bucket".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for bucket in &self.storage.buckets {
            if bucket.name.is_empty()
                || !bucket
                    .name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(ConfigError::ValidationError(format!(
                    "invalid bucket name '{}': use lowercase letters, digits and hyphens",
                    bucket.name
                )));
            }
            if !seen.insert(bucket.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "bucket '{}' is declared twice",
                    bucket.name
                )));
            }
        }
        if self.staging.max_bytes < self.storage.max_file_size() {
            return Err(ConfigError::ValidationError(format!(
                "staging.max_bytes ({}) must hold at least one file of the largest bucket ({})",
                self.staging.max_bytes,
                self.storage.max_file_size()
            )));
        }
        if self.admin.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "admin.session_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Env-mutating tests share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn bucket_strategy() -> impl Strategy<Value = BucketConfig> {
        ("[a-z][a-z0-9-]{0,20}", 1u64..=100 * 1024 * 1024)
            .prop_map(|(name, size)| BucketConfig::new(name, size))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn config_roundtrip(port in 1u16..=65535, ttl in 1u64..=86400, bucket in bucket_strategy()) {
            let mut config = Config::default();
            config.server.port = port;
            config.cache.ttl_seconds = ttl;
            config.storage.buckets = vec![bucket.clone()];

            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.port, port);
            prop_assert_eq!(parsed.cache.ttl_seconds, ttl);
            prop_assert_eq!(parsed.storage.buckets, vec![bucket]);
        }

        #[test]
        fn bucket_size_limit_is_inclusive(bucket in bucket_strategy()) {
            prop_assert!(bucket.check("image/webp", bucket.max_file_size).is_ok());
            prop_assert!(bucket.check("image/webp", bucket.max_file_size + 1).is_err());
        }
    }
}
