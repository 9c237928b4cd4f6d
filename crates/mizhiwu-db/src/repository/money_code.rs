//! # Money Code Repository
//!
//! Money codes are minted outside the portal (the `seed` binary does it
//! for development) and consumed by the charge flow in the ledger.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use mizhiwu_core::{Money, MoneyCode};

/// Repository for money codes.
#[derive(Debug, Clone)]
pub struct MoneyCodeRepository {
    pool: SqlitePool,
}

impl MoneyCodeRepository {
    /// Creates a new MoneyCodeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MoneyCodeRepository { pool }
    }

    /// Gets a code by its token.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<MoneyCode>> {
        let found = sqlx::query_as::<_, MoneyCode>(
            "SELECT id, code, number, isused, user, created_at FROM money_codes WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    /// Lists codes not yet redeemed.
    pub async fn list_unused(&self) -> DbResult<Vec<MoneyCode>> {
        let codes = sqlx::query_as::<_, MoneyCode>(
            "SELECT id, code, number, isused, user, created_at FROM money_codes WHERE isused = 0 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }

    /// Mints a code worth `number`.
    pub async fn insert(&self, code: &str, number: Money) -> DbResult<MoneyCode> {
        if number.is_negative() {
            return Err(DbError::Internal(format!("money code value {} is negative", number)));
        }

        let minted = sqlx::query_as::<_, MoneyCode>(
            r#"
            INSERT INTO money_codes (code, number, isused, created_at)
            VALUES (?1, ?2, 0, ?3)
            RETURNING id, code, number, isused, user, created_at
            "#,
        )
        .bind(code)
        .bind(number)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(minted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_mint_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let codes = db.money_codes();

        let minted = codes.insert("TOPUP50", Money::from_units(50)).await.unwrap();

        let found = codes.get_by_code("TOPUP50").await.unwrap().unwrap();
        assert_eq!(found.id, minted.id);
        assert_eq!(found.created_at, minted.created_at);
        assert_eq!(found.number, Money::from_units(50));
        assert!(!found.isused);
        assert!(found.user.is_none());
        assert_eq!(codes.list_unused().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_value_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.money_codes().insert("BAD", Money::from_cents(-1)).await.is_err());
    }
}
