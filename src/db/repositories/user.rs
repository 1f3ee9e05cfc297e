//! User repository
//!
//! Database operations for admin accounts.

use crate::db::{with_driver, DynDatabasePool, InsertedId};
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Row shape of `users`; the role is stored as text
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<UserRole>()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_USER: &str =
    "SELECT id, username, email, password_hash, role, created_at, updated_at FROM users";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let id = with_driver!(self.pool, |conn| {
            sqlx::query(
                r#"
                INSERT INTO users (username, email, password_hash, role, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.to_string())
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(conn)
            .await
            .context("Failed to create user")?
            .inserted_id()
        });

        Ok(User { id, ..user.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = with_driver!(self.pool, |conn| {
            sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?"))
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get user by ID")?
        });
        row.map(User::try_from).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = with_driver!(self.pool, |conn| {
            sqlx::query_as(&format!("{SELECT_USER} WHERE username = ?"))
                .bind(username)
                .fetch_optional(conn)
                .await
                .context("Failed to get user by username")?
        });
        row.map(User::try_from).transpose()
    }

    async fn count(&self) -> Result<i64> {
        with_driver!(self.pool, |conn| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(conn)
                .await
                .context("Failed to count users")
        })
    }
}
