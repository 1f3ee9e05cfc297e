//! Settings repository
//!
//! Key/value site settings. The company profile is stored here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::{with_driver, DynDatabasePool};

/// Repository trait for settings operations
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get a single setting value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Get the stored values of `keys`; missing keys are absent from the map
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>>;

    /// Write several settings in one transaction
    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()>;
}

/// SQLx-based settings repository
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }

    fn upsert_sql(&self) -> &'static str {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                "INSERT INTO settings (setting_key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
                 ON CONFLICT(setting_key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP"
            }
            DatabaseDriver::Mysql => {
                "INSERT INTO settings (setting_key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
                 ON DUPLICATE KEY UPDATE value = VALUES(value), updated_at = CURRENT_TIMESTAMP"
            }
        }
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        with_driver!(self.pool, |conn| {
            sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE setting_key = ?")
                .bind(key)
                .fetch_optional(conn)
                .await
                .context("Failed to get setting")
        })
    }

    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT setting_key, value FROM settings WHERE setting_key IN ({placeholders})"
        );

        with_driver!(self.pool, |conn| {
            let mut query = sqlx::query(&sql);
            for key in keys {
                query = query.bind(*key);
            }
            let rows = query.fetch_all(conn).await.context("Failed to get settings")?;
            rows.iter()
                .map(|row| -> Result<(String, String)> {
                    Ok((row.try_get("setting_key")?, row.try_get("value")?))
                })
                .collect()
        })
    }

    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()> {
        let upsert = self.upsert_sql();
        with_driver!(self.pool, |conn| {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;
            for (key, value) in settings {
                sqlx::query(upsert)
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to save setting {key}"))?;
            }
            tx.commit().await.context("Failed to commit settings")?;
        });
        Ok(())
    }
}
