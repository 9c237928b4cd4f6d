//! # Database Pool Management
//!
//! Opens the portal's SQLite file and hands out repositories and the ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Portal Database                                    │
//! │                                                                         │
//! │  PortalConfig (apps/api) ──► DbConfig ──► Database::new                │
//! │                                              │                          │
//! │                                 connect + migrate                       │
//! │                                              │                          │
//! │                                              ▼                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ SqlitePool (WAL, foreign_keys, busy_timeout)                    │   │
//! │  └───────┬──────────────┬──────────────┬──────────────┬────────────┘   │
//! │          │              │              │              │                │
//! │      users()     invite_codes()    goods() ...    ledger(settings)     │
//! │      reads          reads           reads         atomic flows         │
//! │                                                                         │
//! │  GET  /api/goods/         ──► reader, never blocked by the writer     │
//! │  PUT  .../moneycode/...   ──► write txn, holds SQLite's write lock     │
//! │  PUT  .../goods/...       ──► queues on busy_timeout, then proceeds    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## In-memory databases
//! `:memory:` lives as long as its one connection, so the pool is pinned to a
//! single connection that never idles out. Code running against it must not
//! hold a connection while awaiting another pool call.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::ledger::{Ledger, LedgerSettings};
use crate::migrations;
use crate::repository::goods::GoodsRepository;
use crate::repository::invite_code::InviteCodeRepository;
use crate::repository::money_code::MoneyCodeRepository;
use crate::repository::purchase::PurchaseRepository;
use crate::repository::user::UserRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/mizhiwu/mizhiwu.db")
///     .max_connections(10)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first start. `:memory:` for tests.
    pub database_path: PathBuf,

    /// Pool size. Default 5.
    pub max_connections: u32,

    /// Connections kept open while idle. Default 1.
    pub min_connections: u32,

    /// How long a request waits for a pooled connection. Default 30s.
    pub connect_timeout: Duration,

    /// Idle connections are closed after this. Default 10 minutes.
    pub idle_timeout: Duration,

    /// How long a writer waits for SQLite's write lock. Default 5s.
    pub busy_timeout: Duration,

    /// Apply embedded migrations on connect. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// An isolated in-memory database, one per call.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
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

    fn is_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", self.database_path.display())
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite; the referrer link relies on ON DELETE SET NULL
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);

        Ok(options)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout);

        if self.is_memory() {
            options.idle_timeout(None).max_lifetime(None)
        } else {
            options.idle_timeout(Some(self.idle_timeout))
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the portal database.
///
/// Cheap to clone: the pool is reference counted. The API keeps one in its
/// shared state and builds repositories per request.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./mizhiwu.db")).await?;
///
/// let goods = db.goods().list().await?;
/// let receipt = db.ledger(LedgerSettings::default()).charge(user_id, "CODE").await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = config.connect_options()?;
        debug!(busy_timeout = ?config.busy_timeout, "Connection options configured");

        let pool = config
            .pool_options()
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool created");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn invite_codes(&self) -> InviteCodeRepository {
        InviteCodeRepository::new(self.pool.clone())
    }

    pub fn money_codes(&self) -> MoneyCodeRepository {
        MoneyCodeRepository::new(self.pool.clone())
    }

    pub fn goods(&self) -> GoodsRepository {
        GoodsRepository::new(self.pool.clone())
    }

    pub fn purchases(&self) -> PurchaseRepository {
        PurchaseRepository::new(self.pool.clone())
    }

    /// The ledger running registration, charge, purchase and invite issuance.
    pub fn ledger(&self, settings: LedgerSettings) -> Ledger {
        Ledger::new(self.pool.clone(), settings)
    }

    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Whether a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
