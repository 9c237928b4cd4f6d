//! # Invite Code Repository
//!
//! Reads join the owner so `InviteCode::owner` carries a username.
//! Issuing codes under the per-owner cap is a ledger flow, not an insert here.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;
use mizhiwu_core::InviteCode;

const SELECT_INVITE_CODE: &str = r#"
    SELECT
        c.id,
        c.code,
        c.owner_id,
        u.username AS owner,
        c.isused,
        c.created_at
    FROM invite_codes c
    LEFT JOIN users u ON u.id = c.owner_id
"#;

/// Repository for invite codes.
#[derive(Debug, Clone)]
pub struct InviteCodeRepository {
    pool: SqlitePool,
}

impl InviteCodeRepository {
    /// Creates a new InviteCodeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InviteCodeRepository { pool }
    }

    /// Gets a code by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<InviteCode>> {
        let sql = format!("{SELECT_INVITE_CODE} WHERE c.id = ?1");
        let code = sqlx::query_as::<_, InviteCode>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }

    /// Gets a code by its token.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<InviteCode>> {
        let sql = format!("{SELECT_INVITE_CODE} WHERE c.code = ?1");
        let found = sqlx::query_as::<_, InviteCode>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// Lists every code, newest first.
    pub async fn list(&self) -> DbResult<Vec<InviteCode>> {
        let sql = format!("{SELECT_INVITE_CODE} ORDER BY c.id DESC");
        let codes = sqlx::query_as::<_, InviteCode>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    /// Lists the codes owned by one account, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> DbResult<Vec<InviteCode>> {
        let sql = format!("{SELECT_INVITE_CODE} WHERE c.owner_id = ?1 ORDER BY c.id DESC");
        let codes = sqlx::query_as::<_, InviteCode>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    /// Counts the codes owned by one account, used or not.
    pub async fn count_by_owner(&self, owner_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invite_codes WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a code without any cap check.
    ///
    /// For seeding and the bootstrap code of a fresh install. `owner_id`
    /// may be `None` for codes not attributed to anyone.
    pub async fn insert(&self, code: &str, owner_id: Option<i64>) -> DbResult<InviteCode> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO invite_codes (code, owner_id, isused, created_at) VALUES (?1, ?2, 0, ?3) RETURNING id",
        )
        .bind(code)
        .bind(owner_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| crate::DbError::not_found("InviteCode", id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let codes = db.invite_codes();

        let inserted = codes.insert("BOOTSTRAP0000001", None).await.unwrap();
        assert!(!inserted.isused);
        assert!(inserted.owner.is_none());

        let found = codes.get_by_code("BOOTSTRAP0000001").await.unwrap().unwrap();
        assert_eq!(found.id, inserted.id);
        assert!(codes.get_by_code("missing").await.unwrap().is_none());
        assert_eq!(codes.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let codes = db.invite_codes();

        codes.insert("SAME", None).await.unwrap();
        let err = codes.insert("SAME", None).await.unwrap_err();
        assert_eq!(err.unique_column(), Some("code"));
    }
}
