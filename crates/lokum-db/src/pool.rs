//! # Connection Pool
//!
//! Opens the storefront's SQLite database and hands out repositories.
//!
//! ## Startup
//! ```text
//! StoreConfig::load() ──► config.db_config() ──► Database::new(..)
//!                                                  │
//!                           ┌──────────────────────┴──────────────────────┐
//!                           │ connect_options()                           │
//!                           │   file:   WAL, synchronous=NORMAL,          │
//!                           │           create if missing                 │
//!                           │   memory: single shared connection          │
//!                           │   both:   foreign_keys=ON, busy_timeout     │
//!                           └──────────────────────┬──────────────────────┘
//!                                                  ▼
//!                                  SqlitePool ──► MIGRATOR.run (optional)
//!                                                  │
//!                  db.products() · db.coupons() · db.carts() · db.orders()
//! ```
//!
//! Two checkouts racing for the last box of a product both write to
//! `products`; SQLite serializes them on its write lock and the loser waits
//! up to `busy_timeout` instead of failing with `SQLITE_BUSY`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::cart::CartRepository;
use crate::repository::coupon::CouponRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the database.
///
/// ```rust,ignore
/// let config = DbConfig::new("./lokum.db").max_connections(8);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,
    pub min_connections: u32,

    /// How long `acquire()` waits for a free connection.
    pub connect_timeout: Duration,

    /// How long a writer waits on SQLite's lock.
    pub busy_timeout: Duration,

    /// `None` keeps idle connections open forever.
    pub idle_timeout: Option<Duration>,

    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration with pool defaults (5 connections).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private in-memory database, migrated on open. Used by tests.
    ///
    /// Each SQLite connection to `:memory:` sees its own empty database, so
    /// the pool holds exactly one connection and never lets it go idle.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
            idle_timeout: None,
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        options.foreign_keys(true).busy_timeout(self.busy_timeout)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the storefront database. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    ///
    /// ## Errors
    /// - `ConnectionFailed` if the file can't be opened or created
    /// - `MigrationFailed` if a migration doesn't apply
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening storefront database"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(in_memory = config.is_in_memory(), "Pool connected");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    /// The underlying pool, for ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn coupons(&self) -> CouponRepository {
        CouponRepository::new(self.pool.clone())
    }

    /// ```rust,ignore
    /// let cart = db.carts().add_item(&owner, &product_id, None, 2).await?;
    /// ```
    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes them all.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Storefront database closed");
    }

    /// `true` while the pool can still run a query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
