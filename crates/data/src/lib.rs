//! Persistence layer for userdesk.
//!
//! Holds the user model and its pre-save hook, the [`UserStore`] seam the
//! web layer talks to, and two implementations of it: a PostgreSQL store
//! built on diesel with an r2d2 pool, and an in-memory store.

use std::time::Duration;

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use serde::{Deserialize, Serialize};

pub mod migrations;
pub mod schema;
pub mod user;

pub use migrations::MigrationRunner;
pub use user::{
    MemoryUserStore, NewUser, PgUserStore, Role, User, UserChanges, UserHook, UserId, UserStore,
};

pub type DieselPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Invalid ID")]
    InvalidId,

    #[error("Email already in use")]
    EmailTaken,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Database connection failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("User store lock poisoned")]
    Poisoned,
}

/// Connection settings for the PostgreSQL backend.
///
/// An empty `url` means no database is configured; the server then falls
/// back to the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub url: String,
    pub pool_size: u32,
    pub min_idle: Option<u32>,
    /// Milliseconds to wait for a pooled connection.
    pub connection_timeout: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: 10,
            min_idle: Some(2),
            connection_timeout: 30_000,
        }
    }
}

impl DbConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Builds the r2d2 pool described by `config`.
pub fn connect_pool(config: &DbConfig) -> DataResult<DieselPool> {
    let manager = ConnectionManager::<PgConnection>::new(&config.url);
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .min_idle(config.min_idle)
        .connection_timeout(Duration::from_millis(config.connection_timeout))
        .build(manager)?;
    tracing::info!(pool_size = config.pool_size, "database pool ready");
    Ok(pool)
}
