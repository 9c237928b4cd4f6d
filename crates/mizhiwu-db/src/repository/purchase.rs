//! # Purchase History Repository
//!
//! Rows are appended by the purchase flow in the ledger; this side only
//! reads them back.

use sqlx::SqlitePool;

use crate::error::DbResult;
use mizhiwu_core::PurchaseHistory;

/// Repository for purchase history.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Lists one account's purchases, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> DbResult<Vec<PurchaseHistory>> {
        let rows = sqlx::query_as::<_, PurchaseHistory>(
            r#"
            SELECT
                p.id,
                p.user_id,
                p.number,
                p.goods_id,
                g.name AS goods_name,
                p.created_at
            FROM purchase_history p
            LEFT JOIN goods g ON g.id = p.goods_id
            WHERE p.user_id = ?1
            ORDER BY p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Counts one account's purchases.
    pub async fn count_by_user(&self, user_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_history WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
