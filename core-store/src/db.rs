//! # Database Connection Pool Module
//!
//! SQLite pooling for the pipeline store. WAL journaling lets candidate
//! reads proceed while payload upserts are in flight, and a busy timeout
//! absorbs write collisions between concurrent resolutions. Migrations are
//! embedded with `sqlx::migrate!` and run on pool creation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_store::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("pipeline.db")).await?;
//! ```
//!
//! Tests use `create_test_pool()`, which opens a uniquely named in-memory
//! database with the schema already applied.

use crate::{Result, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection pool settings for the SQLite store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path, or a `file:...?mode=memory` URL for tests
    pub database_url: String,
    /// Connections kept open even when idle
    pub min_connections: u32,
    /// Upper bound on open connections
    pub max_connections: u32,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database before erroring
    pub busy_timeout: Duration,
    /// Prepared statements cached per connection
    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// Configuration for a file-backed store at the given path.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();

        Self {
            database_url: format!("sqlite:{}", path.display()),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            statement_cache_capacity: 100,
        }
    }

    /// Configuration for an in-memory database.
    ///
    /// Each call names its own shared-cache database, so every connection in
    /// one pool sees the same schema while separate pools stay isolated.
    pub fn in_memory() -> Self {
        static NEXT_DB_ID: AtomicU64 = AtomicU64::new(0);
        let id = NEXT_DB_ID.fetch_add(1, Ordering::Relaxed);

        Self {
            database_url: format!("sqlite:file:memdb-{}?mode=memory&cache=shared", id),
            ..Self::new("unused")
        }
    }

    /// Set the minimum number of pooled connections
    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of pooled connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the pool acquire timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the statement cache capacity per connection
    pub fn with_statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// SQLite options shared by every connection in the pool.
fn connect_options(config: &DatabaseConfig) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(StoreError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true)
        .busy_timeout(config.busy_timeout)
        // Payload rows are a few KB each; 8MB of page cache covers the
        // working set of a busy session
        .pragma("cache_size", "-8000")
        .pragma("mmap_size", "67108864")
        // Replaced payloads leave free pages behind
        .pragma("auto_vacuum", "INCREMENTAL")
        .statement_cache_capacity(config.statement_cache_capacity);

    Ok(options)
}

/// Open a connection pool, apply migrations, and verify the store answers.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening store connection pool"
    );

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options(&config)?)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to open connection pool");
            StoreError::Database(e)
        })?;

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    debug!(connections = pool.size(), "Store ready");
    Ok(pool)
}

/// In-memory pool with migrations applied, for tests and demos.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        StoreError::Migration(e.to_string())
    })?;

    debug!("Migrations up to date");
    Ok(())
}

/// One trivial query to fail fast when the backing file is unusable.
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Store health check failed");
        StoreError::Database(e)
    })?;

    Ok(())
}
