//! # User Repository
//!
//! Account lookups. Every read joins the referrer so `User::invite_user`
//! carries the referrer's username.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mizhiwu_core::{NewUser, User};

/// Column list shared by every account read.
pub(crate) const SELECT_USER: &str = r#"
    SELECT
        u.id,
        u.username,
        u.email,
        u.password_hash,
        u.is_staff,
        u.balance,
        u.level,
        u.level_expire_time,
        u.transfer_enable,
        u.invite_user_id,
        r.username AS invite_user,
        u.invitecode_num,
        u.port,
        u.method,
        u.sspasswd,
        u.protocol,
        u.protocol_param,
        u.obfs,
        u.obfs_param,
        u.enable,
        u.last_use_time,
        u.upload_traffic,
        u.download_traffic,
        u.theme,
        u.date_joined
    FROM users u
    LEFT JOIN users r ON r.id = u.invite_user_id
"#;

/// Inserts an account on an existing connection (pool or transaction).
///
/// Returns the new id. Unique violations surface as
/// [`DbError::UniqueViolation`] naming the column (`users.port`, ...).
pub(crate) async fn insert_user(
    conn: &mut SqliteConnection,
    user: &NewUser,
    port: i64,
) -> DbResult<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (
            username, email, password_hash, is_staff,
            invite_user_id, invitecode_num, port, sspasswd, date_joined
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING id
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.invite_user_id)
    .bind(user.invitecode_num)
    .bind(port)
    .bind(&user.sspasswd)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Repository for account reads.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets an account by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE u.id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Gets an account by id, failing with `NotFound` when absent.
    pub async fn require(&self, id: i64) -> DbResult<User> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id.to_string()))
    }

    /// Gets an account by username.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE u.username = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Lists all accounts, oldest first.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("{SELECT_USER} ORDER BY u.id");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;

        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    /// Counts accounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Whether an email is taken.
    pub async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Highest assigned service port, `None` with no accounts.
    pub async fn max_port(&self) -> DbResult<Option<i64>> {
        let port: Option<i64> = sqlx::query_scalar("SELECT MAX(port) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(port)
    }

    /// Inserts an account outside the registration flow (seeding, admin
    /// provisioning) on the next free port above `base_port`.
    ///
    /// No invite code is consumed.
    pub async fn insert(&self, user: &NewUser, base_port: i64) -> DbResult<User> {
        let port = self.max_port().await?.unwrap_or(base_port) + 1;

        let mut conn = self.pool.acquire().await?;
        let id = insert_user(&mut *conn, user, port).await?;
        drop(conn);

        debug!(id, username = %user.username, port, "Inserted user");
        self.require(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "x".to_string(),
            is_staff: false,
            invite_user_id: None,
            invitecode_num: 5,
            sspasswd: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();

        let alice = users.insert(&new_user("alice"), 10_000).await.unwrap();
        assert_eq!(alice.port, 10_001);
        assert_eq!(alice.theme, "default");
        assert!(alice.enable);
        assert!(alice.balance.is_zero());
        assert!(alice.invite_user.is_none());

        let by_name = users.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);
        assert!(users.username_exists("alice").await.unwrap());
        assert!(users.email_exists("alice@example.com").await.unwrap());
        assert!(!users.username_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_referrer_username_is_joined() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();

        let alice = users.insert(&new_user("alice"), 10_000).await.unwrap();
        let mut bob = new_user("bob");
        bob.invite_user_id = Some(alice.id);
        let bob = users.insert(&bob, 10_000).await.unwrap();

        assert_eq!(bob.invite_user.as_deref(), Some("alice"));
        assert_eq!(bob.port, 10_002);
        assert_eq!(users.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();

        users.insert(&new_user("alice"), 10_000).await.unwrap();
        let mut dup = new_user("alice");
        dup.email = "other@example.com".to_string();

        let err = users.insert(&dup, 10_000).await.unwrap_err();
        assert_eq!(err.unique_column(), Some("username"));
    }

    #[tokio::test]
    async fn test_require_missing_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(db.users().require(42).await, Err(DbError::NotFound { .. })));
    }
}
