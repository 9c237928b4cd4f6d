//! # Database Error Types
//!
//! Errors raised by the store and by the ledger flows.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error                           CoreError (rule rejection)      │
//! │   ├── RowNotFound      → NotFound            │                          │
//! │   ├── UNIQUE           → UniqueViolation     │                          │
//! │   ├── FOREIGN KEY      → ForeignKeyViolation │                          │
//! │   ├── CHECK            → CheckViolation      │                          │
//! │   └── pool / other     → ...                 ▼                          │
//! │                          DbError ◄──── DbError::Rule                   │
//! │                             │                                           │
//! │                             ▼                                           │
//! │  ApiError (apps/api): Rule → 400/403, NotFound → 404, rest → 500       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mizhiwu_core::CoreError;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write.
    ///
    /// `target` is `table.column` as SQLite reports it, e.g. `users.port`
    /// when two registrations picked the same service port.
    #[error("Duplicate value for {target}")]
    UniqueViolation { target: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A CHECK constraint rejected the write (negative balance or amount).
    #[error("Check constraint failed: {0}")]
    CheckViolation(String),

    /// Database file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A flow could not complete its transaction.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No pooled connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),

    /// A business rule rejected the operation. Nothing was written.
    #[error(transparent)]
    Rule(#[from] CoreError),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Column of a unique violation (`users.port` → `port`).
    pub fn unique_column(&self) -> Option<&str> {
        match self {
            DbError::UniqueViolation { target } => target.rsplit('.').next(),
            _ => None,
        }
    }
}

/// `"UNIQUE constraint failed: users.email"` → `"users.email"`
fn constraint_target(message: &str) -> &str {
    message
        .split_once(": ")
        .map(|(_, target)| target.trim())
        .unwrap_or(message)
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        target: constraint_target(message).to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message.to_string()),
                    ErrorKind::CheckViolation => DbError::CheckViolation(message.to_string()),
                    _ => DbError::QueryFailed(message.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
