//! # Goods Repository
//!
//! The catalogue is reference data: the portal only reads it.

use sqlx::SqlitePool;

use crate::error::DbResult;
use mizhiwu_core::{Goods, Money};

/// Repository for catalogue entries.
#[derive(Debug, Clone)]
pub struct GoodsRepository {
    pool: SqlitePool,
}

impl GoodsRepository {
    /// Creates a new GoodsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        GoodsRepository { pool }
    }

    /// Lists the catalogue, cheapest first.
    pub async fn list(&self) -> DbResult<Vec<Goods>> {
        let goods = sqlx::query_as::<_, Goods>(
            "SELECT id, name, number, level, transfer FROM goods ORDER BY number, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(goods)
    }

    /// Gets an entry by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Goods>> {
        let goods = sqlx::query_as::<_, Goods>(
            "SELECT id, name, number, level, transfer FROM goods WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(goods)
    }

    /// Adds an entry. `transfer` is in GB.
    pub async fn insert(&self, name: &str, number: Money, level: i64, transfer: i64) -> DbResult<Goods> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO goods (name, number, level, transfer) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(name)
        .bind(number)
        .bind(level)
        .bind(transfer)
        .fetch_one(&self.pool)
        .await?;

        Ok(Goods {
            id,
            name: name.to_string(),
            number,
            level,
            transfer,
        })
    }
}
