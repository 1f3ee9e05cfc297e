//! Database layer
//!
//! Persistence for Showfloor on either SQLite (default, single file) or
//! MySQL. Repositories receive a [`DynDatabasePool`] and dispatch on its
//! driver with [`with_driver!`], which runs one query body against whichever
//! concrete sqlx pool is configured.

/// Run `$body` with `$conn` bound to the concrete sqlx pool of `$pool`.
///
/// The body is expanded once per driver, so it must only use query text
/// both dialects accept (`?` placeholders, no upsert syntax).
macro_rules! with_driver {
    ($pool:expr, |$conn:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $conn = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool not available"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $conn = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool not available"))?;
                $body
            }
        }
    };
}

pub(crate) use with_driver;

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Row id produced by an `INSERT`, for either backend
pub trait InsertedId {
    fn inserted_id(&self) -> i64;
}

impl InsertedId for sqlx::sqlite::SqliteQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertedId for sqlx::mysql::MySqlQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}
