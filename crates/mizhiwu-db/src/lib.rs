//! # mizhiwu-db: Storage and Ledger for the Mizhiwu Portal
//!
//! SQLite access for the portal, plus the [`Ledger`] that runs every
//! state-changing flow in a single transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizhiwu Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (PUT /api/users/7/moneycode/X/)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     mizhiwu-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │    Ledger    │  │   │
//! │  │   │   (pool.rs)   │    │  (reads)      │    │  (flows)     │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ UserRepo      │    │ register     │  │   │
//! │  │   │ migrations    │    │ InviteCodeRepo│    │ charge       │  │   │
//! │  │   │ health check  │    │ GoodsRepo ... │    │ purchase     │  │   │
//! │  │   └───────────────┘    └───────────────┘    │ issue invite │  │   │
//! │  │                                             └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table reads and plain inserts
//! - [`ledger`] - Registration, charge, purchase, invite issuance
//! - [`password`] - Argon2 password hashing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizhiwu_db::{Database, DbConfig, LedgerSettings};
//!
//! let db = Database::new(DbConfig::new("./mizhiwu.db")).await?;
//! let ledger = db.ledger(LedgerSettings::default());
//!
//! let receipt = ledger.charge(caller_id, "TOPUP50").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;
pub mod token;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::{Ledger, LedgerSettings};
pub use pool::{Database, DbConfig};

pub use repository::goods::GoodsRepository;
pub use repository::invite_code::InviteCodeRepository;
pub use repository::money_code::MoneyCodeRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::user::UserRepository;
