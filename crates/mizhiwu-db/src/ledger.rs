//! # Ledger
//!
//! The four flows that change account state, each one atomic.
//!
//! ## Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Ledger flows                                  │
//! │                                                                         │
//! │  register            pre-checks (pool)        one transaction           │
//! │  ─────────           ─────────────────        ───────────────           │
//! │  form ──► shape, code found/unused, ──► UPDATE invite_codes (latch)     │
//! │           username/email free           SELECT MAX(port)                │
//! │                                         INSERT users  ◄─ port clash?    │
//! │                                                          retry ≤ 5      │
//! │                                                                         │
//! │  charge              UPDATE money_codes (latch) RETURNING number        │
//! │                      UPDATE users ... WHERE balance <= MAX - number     │
//! │                                                                         │
//! │  purchase            goods lookup (pool)                                │
//! │                      UPDATE users ... WHERE balance >= price            │
//! │                      INSERT purchase_history                            │
//! │                                                                         │
//! │  issue_invite_code   INSERT ... SELECT ... WHERE is_staff OR count<=cap │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//! Every write transaction opens with its write statement, so SQLite hands
//! out the write lock before anything is read and a concurrent writer waits
//! on the busy timeout instead of failing on a stale snapshot.
//!
//! One-shot latches are conditional UPDATEs: the row count decides who won.
//! When a guarded write matches nothing, the flow reads the current state
//! and lets the rule in `mizhiwu_core::rules` build the rejection.
//!
//! Charge and purchase act on the authenticated caller. The HTTP layer only
//! checks that the account named in the URL exists.

use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use mizhiwu_core::rules::{
    check_invite_code, check_invite_quota, ensure_affordable, next_service_port, PurchasePlan, PORT_STEP,
};
use mizhiwu_core::validation::{parse_goods_id, validate_code, validate_owner, validate_registration};
use mizhiwu_core::views::{ChargeReceipt, IssuedInviteCode, PurchaseReceipt};
use mizhiwu_core::{
    Actor, CoreError, Money, NewUser, RegistrationForm, User, ValidationError, DEFAULT_BASE_PORT,
    DEFAULT_INVITECODE_NUM, INVITE_CODE_LENGTH, MAX_PORT_ATTEMPTS, SS_PASSWORD_LENGTH,
};

use crate::error::{DbError, DbResult};
use crate::password::hash_password;
use crate::repository::goods::GoodsRepository;
use crate::repository::invite_code::InviteCodeRepository;
use crate::repository::user::{insert_user, UserRepository};
use crate::token::random_token;

// =============================================================================
// Settings
// =============================================================================

/// Deployment-specific knobs of the flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Port the allocator counts up from on an empty database.
    pub base_port: i64,
    /// Invite code cap given to new accounts.
    pub invitecode_num: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            base_port: DEFAULT_BASE_PORT,
            invitecode_num: DEFAULT_INVITECODE_NUM,
        }
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Runs registration, charge, purchase and invite issuance.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    settings: LedgerSettings,
    users: UserRepository,
    invite_codes: InviteCodeRepository,
    goods: GoodsRepository,
}

impl Ledger {
    /// Creates a ledger over `pool`.
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        Ledger {
            users: UserRepository::new(pool.clone()),
            invite_codes: InviteCodeRepository::new(pool.clone()),
            goods: GoodsRepository::new(pool.clone()),
            pool,
            settings,
        }
    }

    /// Settings this ledger was built with.
    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Creates an account from a registration form, consuming its invite code.
    ///
    /// ## Errors
    /// - `Rule(Fields)`: every shape, invite code and uniqueness failure at once
    /// - `Rule(InviteCodeUsed)`: another registration consumed the code first
    /// - `Rule(PortsExhausted)`: no port left above the current maximum
    pub async fn register(&self, form: &RegistrationForm) -> DbResult<User> {
        let code = form.code.trim();
        let email = form.email.trim();

        let mut errors = validate_registration(form).err().unwrap_or_default();

        if !errors.contains("code") {
            if let Err(e) = check_invite_code(self.invite_codes.get_by_code(code).await?) {
                errors.push_core(e);
            }
        }
        if !errors.contains("username") && self.users.username_exists(&form.username).await? {
            errors.push(ValidationError::AlreadyExists {
                field: "username".to_string(),
            });
        }
        if !errors.contains("email") && self.users.email_exists(email).await? {
            errors.push(ValidationError::AlreadyExists {
                field: "email".to_string(),
            });
        }

        if !errors.is_empty() {
            warn!(username = %form.username, errors = %errors, "Registration rejected");
            return Err(CoreError::Fields(errors).into());
        }

        let password = form.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| DbError::Internal(format!("password hashing task failed: {}", e)))??;

        let mut new_user = NewUser {
            username: form.username.clone(),
            email: email.to_string(),
            password_hash,
            is_staff: false,
            invite_user_id: None,
            invitecode_num: self.settings.invitecode_num,
            sspasswd: random_token(SS_PASSWORD_LENGTH),
        };

        for attempt in 1..=MAX_PORT_ATTEMPTS {
            match self.try_register(&mut new_user, code).await {
                Ok((id, port)) => {
                    info!(
                        user_id = id,
                        username = %new_user.username,
                        port,
                        invite_user_id = ?new_user.invite_user_id,
                        "User registered"
                    );
                    return self.users.require(id).await;
                }
                Err(e) if e.unique_column() == Some("port") => {
                    debug!(attempt, "Service port taken concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(username = %new_user.username, "Service port allocation kept colliding");
        Err(DbError::TransactionFailed(format!(
            "service port still contended after {} attempts",
            MAX_PORT_ATTEMPTS
        )))
    }

    /// One registration attempt. Dropping `tx` on any error rolls the invite
    /// code back to unused.
    async fn try_register(&self, user: &mut NewUser, code: &str) -> DbResult<(i64, i64)> {
        let mut tx = self.pool.begin().await?;

        let consumed: Option<Option<i64>> = sqlx::query_scalar(
            "UPDATE invite_codes SET isused = 1 WHERE code = ?1 AND isused = 0 RETURNING owner_id",
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(owner_id) = consumed else {
            tx.rollback().await?;
            let err = check_invite_code(self.invite_codes.get_by_code(code).await?)
                .err()
                .unwrap_or(CoreError::InviteCodeUsed);
            warn!(code = %code, "Invite code lost to a concurrent registration");
            return Err(err.into());
        };
        user.invite_user_id = owner_id;

        let current_max: Option<i64> = sqlx::query_scalar("SELECT MAX(port) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let step = rand::thread_rng().gen_range(PORT_STEP);
        let port = next_service_port(current_max, self.settings.base_port, step)?;

        let id = insert_user(&mut *tx, user, port).await.map_err(|e| match e.unique_column() {
            Some(field @ ("username" | "email")) => DbError::Rule(
                ValidationError::AlreadyExists {
                    field: field.to_string(),
                }
                .into(),
            ),
            _ => e,
        })?;

        tx.commit().await?;
        Ok((id, port))
    }

    // -------------------------------------------------------------------------
    // Charge
    // -------------------------------------------------------------------------

    /// Redeems a money code onto the caller's balance.
    ///
    /// Unknown and already-redeemed codes both fail with `MoneyCodeIncorrect`
    /// and change nothing.
    pub async fn charge(&self, caller_id: i64, code: &str) -> DbResult<ChargeReceipt> {
        let code = validate_code("code", code).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let credited: Option<Money> = sqlx::query_scalar(
            r#"
            UPDATE money_codes
            SET isused = 1,
                user = (SELECT username FROM users WHERE id = ?2)
            WHERE code = ?1 AND isused = 0
            RETURNING number
            "#,
        )
        .bind(&code)
        .bind(caller_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(number) = credited else {
            tx.rollback().await?;
            warn!(user_id = caller_id, "Money code rejected");
            return Err(CoreError::MoneyCodeIncorrect.into());
        };

        // Highest balance the code can still be credited to
        let ceiling = Money::from_cents(i64::MAX)
            .checked_sub(number)
            .unwrap_or(Money::from_cents(i64::MAX));

        let account: Option<(String, Money)> = sqlx::query_as(
            "UPDATE users SET balance = balance + ?1 WHERE id = ?2 AND balance <= ?3 RETURNING username, balance",
        )
        .bind(number)
        .bind(caller_id)
        .bind(ceiling)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((username, balance)) = account else {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
                .bind(caller_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            if exists.is_none() {
                return Err(DbError::not_found("User", caller_id.to_string()));
            }
            warn!(user_id = caller_id, credited = %number, "Money code would overflow the balance");
            return Err(CoreError::BalanceOverflow.into());
        };

        tx.commit().await?;

        info!(
            user_id = caller_id,
            code = %code,
            credited = %number,
            balance = %balance,
            "Money code redeemed"
        );

        Ok(ChargeReceipt {
            user: username,
            balance,
        })
    }

    // -------------------------------------------------------------------------
    // Purchase
    // -------------------------------------------------------------------------

    /// Buys goods for the caller.
    ///
    /// Debits the price, replaces the level, adds the quota and appends a
    /// purchase history row, all or nothing.
    pub async fn purchase(&self, caller_id: i64, good: &str) -> DbResult<PurchaseReceipt> {
        let goods = match parse_goods_id(good) {
            Some(id) => self.goods.get_by_id(id).await?,
            None => None,
        };
        let goods = goods.ok_or_else(|| CoreError::GoodsNotFound(good.trim().to_string()))?;
        let plan = PurchasePlan::for_goods(&goods)?;

        let mut tx = self.pool.begin().await?;

        let account: Option<(String, Money, i64)> = sqlx::query_as(
            r#"
            UPDATE users
            SET balance = balance - ?1,
                level = ?2,
                transfer_enable = transfer_enable + ?3
            WHERE id = ?4
              AND balance >= ?1
              AND transfer_enable <= ?5
            RETURNING username, balance, transfer_enable
            "#,
        )
        .bind(plan.price)
        .bind(plan.level)
        .bind(plan.transfer_bytes)
        .bind(caller_id)
        .bind(i64::MAX - plan.transfer_bytes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((username, balance, transfer_enable)) = account else {
            let current: Option<Money> = sqlx::query_scalar("SELECT balance FROM users WHERE id = ?1")
                .bind(caller_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            let balance = current.ok_or_else(|| DbError::not_found("User", caller_id.to_string()))?;
            if let Err(e) = ensure_affordable(balance, plan.price) {
                warn!(user_id = caller_id, goods_id = goods.id, balance = %balance, price = %plan.price, "Purchase rejected");
                return Err(e.into());
            }
            warn!(user_id = caller_id, goods_id = goods.id, "Purchase would overflow the transfer quota");
            return Err(CoreError::QuotaOverflow.into());
        };

        sqlx::query(
            "INSERT INTO purchase_history (user_id, number, goods_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(caller_id)
        .bind(plan.price)
        .bind(goods.id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            user_id = caller_id,
            goods_id = goods.id,
            price = %plan.price,
            level = plan.level,
            balance = %balance,
            "Goods purchased"
        );

        Ok(PurchaseReceipt::new(username, balance, transfer_enable))
    }

    // -------------------------------------------------------------------------
    // Invite issuance
    // -------------------------------------------------------------------------

    /// Issues a new invite code to `owner` on behalf of `actor`.
    ///
    /// ## Errors
    /// - `Rule(OwnerNotFound)`: no account named `owner`
    /// - `Rule(PermissionDenied)`: `actor` is neither the owner nor staff
    /// - `Rule(InviteLimitReached)`: a non-staff owner already holds more
    ///   codes than their cap
    pub async fn issue_invite_code(&self, actor: &Actor, owner: &str) -> DbResult<IssuedInviteCode> {
        let owner_name = validate_owner(owner).map_err(CoreError::from)?;
        let owner = self
            .users
            .get_by_username(&owner_name)
            .await?
            .ok_or(CoreError::OwnerNotFound(owner_name))?;

        if !owner.visible_to(actor) {
            warn!(actor_id = actor.id, owner_id = owner.id, "Invite issuance for another account refused");
            return Err(CoreError::PermissionDenied.into());
        }

        let code = random_token(INVITE_CODE_LENGTH);

        // Cap check and insert in one statement so concurrent requests
        // cannot both pass the count.
        let inserted = sqlx::query(
            r#"
            INSERT INTO invite_codes (code, owner_id, isused, created_at)
            SELECT ?1, u.id, 0, ?2
            FROM users u
            WHERE u.id = ?3
              AND (u.is_staff = 1
                   OR (SELECT COUNT(*) FROM invite_codes WHERE owner_id = u.id) <= u.invitecode_num)
            "#,
        )
        .bind(&code)
        .bind(Utc::now())
        .bind(owner.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            let existing = self.invite_codes.count_by_owner(owner.id).await?;
            if let Err(e) = check_invite_quota(&owner.username, owner.is_staff, existing, owner.invitecode_num) {
                warn!(owner_id = owner.id, existing, cap = owner.invitecode_num, "Invite code cap reached");
                return Err(e.into());
            }
            return Err(DbError::TransactionFailed(format!(
                "invite code insert for {} matched no row",
                owner.username
            )));
        }

        info!(owner_id = owner.id, owner = %owner.username, code = %code, "Invite code issued");

        Ok(IssuedInviteCode {
            owner: owner.username,
            code,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use mizhiwu_core::{FieldErrors, GB};

    async fn setup() -> (Database, Ledger, User) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.ledger(LedgerSettings::default());
        let admin = db
            .users()
            .insert(
                &NewUser {
                    username: "admin".to_string(),
                    email: "admin@example.com".to_string(),
                    password_hash: hash_password("adminpass").unwrap(),
                    is_staff: true,
                    invite_user_id: None,
                    invitecode_num: DEFAULT_INVITECODE_NUM,
                    sspasswd: "adminss".to_string(),
                },
                DEFAULT_BASE_PORT,
            )
            .await
            .unwrap();
        (db, ledger, admin)
    }

    fn form(username: &str, code: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "password1".to_string(),
            code: code.to_string(),
        }
    }

    /// Registers `username` with a fresh invite code owned by `owner`.
    async fn register(db: &Database, ledger: &Ledger, owner: &User, username: &str) -> User {
        let code = format!("INV-{}", username);
        db.invite_codes().insert(&code, Some(owner.id)).await.unwrap();
        ledger.register(&form(username, &code)).await.unwrap()
    }

    async fn fund(db: &Database, ledger: &Ledger, user: &User, amount: Money) {
        let code = format!("FUND-{}-{}", user.id, amount.cents());
        db.money_codes().insert(&code, amount).await.unwrap();
        ledger.charge(user.id, &code).await.unwrap();
    }

    fn field_errors(err: DbError) -> FieldErrors {
        match err {
            DbError::Rule(core) => core.into_field_errors(),
            other => panic!("expected a rule rejection, got {other:?}"),
        }
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_consumes_code_and_links_owner() {
        let (db, ledger, admin) = setup().await;
        db.invite_codes().insert("WELCOME", Some(admin.id)).await.unwrap();

        let user = ledger.register(&form("alice", "WELCOME")).await.unwrap();

        assert_eq!(user.invite_user.as_deref(), Some("admin"));
        assert_eq!(user.invite_user_id, Some(admin.id));
        assert!((admin.port + 1..=admin.port + 3).contains(&user.port));
        assert_eq!(user.invitecode_num, DEFAULT_INVITECODE_NUM);
        assert_eq!(user.sspasswd.len(), SS_PASSWORD_LENGTH);
        assert!(!user.is_staff);
        assert!(crate::password::verify_password("password1", &user.password_hash));

        let code = db.invite_codes().get_by_code("WELCOME").await.unwrap().unwrap();
        assert!(code.isused);
    }

    #[tokio::test]
    async fn test_register_used_code_creates_nothing() {
        let (db, ledger, admin) = setup().await;
        db.invite_codes().insert("ONCE", Some(admin.id)).await.unwrap();
        ledger.register(&form("alice", "ONCE")).await.unwrap();

        let errors = field_errors(ledger.register(&form("bob", "ONCE")).await.unwrap_err());

        assert_eq!(errors.get("code"), Some(&["invite code already used".to_string()][..]));
        assert!(db.users().get_by_username("bob").await.unwrap().is_none());
        assert_eq!(db.users().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_register_reports_every_field() {
        let (db, ledger, admin) = setup().await;
        register(&db, &ledger, &admin, "alice").await;

        let mut dup = form("alice", "NO-SUCH-CODE");
        dup.email = "alice@example.com".to_string();
        let errors = field_errors(ledger.register(&dup).await.unwrap_err());

        assert_eq!(errors.get("code"), Some(&["invite code incorrect".to_string()][..]));
        assert_eq!(errors.get("username"), Some(&["user already exists".to_string()][..]));
        assert_eq!(errors.get("email"), Some(&["email already exists".to_string()][..]));
    }

    #[tokio::test]
    async fn test_register_first_port_counts_from_base() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.ledger(LedgerSettings {
            base_port: 20_000,
            invitecode_num: 2,
        });
        db.invite_codes().insert("BOOT", None).await.unwrap();

        let user = ledger.register(&form("first", "BOOT")).await.unwrap();

        assert!((20_001..=20_003).contains(&user.port));
        assert!(user.invite_user.is_none());
        assert_eq!(user.invitecode_num, 2);
    }

    #[tokio::test]
    async fn test_register_ports_increase() {
        let (db, ledger, admin) = setup().await;
        let mut last = admin.port;
        for name in ["u1", "u2", "u3", "u4"] {
            let user = register(&db, &ledger, &admin, name).await;
            assert!(user.port > last && user.port <= last + 3);
            last = user.port;
        }
    }

    // -------------------------------------------------------------------------
    // Charge
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_charge_credits_and_latches_code() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        fund(&db, &ledger, &alice, Money::from_units(10)).await;
        db.money_codes().insert("TOPUP50", Money::from_units(50)).await.unwrap();

        let receipt = ledger.charge(alice.id, "TOPUP50").await.unwrap();

        assert_eq!(receipt.user, "alice");
        assert_eq!(receipt.balance, Money::from_units(60));
        let code = db.money_codes().get_by_code("TOPUP50").await.unwrap().unwrap();
        assert!(code.isused);
        assert_eq!(code.user.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_charge_twice_rejected_without_change() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        db.money_codes().insert("TOPUP50", Money::from_units(50)).await.unwrap();
        ledger.charge(alice.id, "TOPUP50").await.unwrap();

        let err = ledger.charge(alice.id, "TOPUP50").await.unwrap_err();

        assert!(matches!(err, DbError::Rule(CoreError::MoneyCodeIncorrect)));
        let alice = db.users().require(alice.id).await.unwrap();
        assert_eq!(alice.balance, Money::from_units(50));
    }

    #[tokio::test]
    async fn test_charge_unknown_code() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;

        let errors = field_errors(ledger.charge(alice.id, "NOPE").await.unwrap_err());
        assert_eq!(errors.get("code"), Some(&["code incorrect".to_string()][..]));

        let errors = field_errors(ledger.charge(alice.id, "  ").await.unwrap_err());
        assert!(errors.contains("code"));
    }

    #[tokio::test]
    async fn test_charge_overflowing_balance_changes_nothing() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        fund(&db, &ledger, &alice, Money::from_cents(i64::MAX)).await;
        db.money_codes().insert("BIG2", Money::from_cents(10)).await.unwrap();

        let errors = field_errors(ledger.charge(alice.id, "BIG2").await.unwrap_err());

        assert_eq!(errors.get("code"), Some(&["balance overflow".to_string()][..]));
        let code = db.money_codes().get_by_code("BIG2").await.unwrap().unwrap();
        assert!(!code.isused);
        assert!(code.user.is_none());
        let alice = db.users().require(alice.id).await.unwrap();
        assert_eq!(alice.balance, Money::from_cents(i64::MAX));
    }

    #[tokio::test]
    async fn test_charge_up_to_the_ceiling_is_accepted() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        fund(&db, &ledger, &alice, Money::from_cents(i64::MAX - 10)).await;
        db.money_codes().insert("LAST10", Money::from_cents(10)).await.unwrap();

        let receipt = ledger.charge(alice.id, "LAST10").await.unwrap();
        assert_eq!(receipt.balance, Money::from_cents(i64::MAX));
    }

    // -------------------------------------------------------------------------
    // Purchase
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_purchase_debits_and_grants() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        fund(&db, &ledger, &alice, Money::from_units(20)).await;
        let goods = db.goods().insert("Basic", Money::from_units(15), 2, 10).await.unwrap();

        let receipt = ledger.purchase(alice.id, &goods.id.to_string()).await.unwrap();

        assert_eq!(receipt.user, "alice");
        assert_eq!(receipt.balance, Money::from_units(5));
        assert_eq!(receipt.transfer_enable, 10.0);

        let alice = db.users().require(alice.id).await.unwrap();
        assert_eq!(alice.level, 2);
        assert_eq!(alice.transfer_enable, 10 * GB);

        let history = db.purchases().list_by_user(alice.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].number, Money::from_units(15));
        assert_eq!(history[0].goods_name.as_deref(), Some("Basic"));
    }

    #[tokio::test]
    async fn test_purchase_insufficient_balance_changes_nothing() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        fund(&db, &ledger, &alice, Money::from_units(20)).await;
        let goods = db.goods().insert("Pro", Money::from_units(30), 2, 10).await.unwrap();

        let errors = field_errors(ledger.purchase(alice.id, &goods.id.to_string()).await.unwrap_err());
        assert_eq!(errors.get("good"), Some(&["insufficient balance".to_string()][..]));

        let alice = db.users().require(alice.id).await.unwrap();
        assert_eq!(alice.balance, Money::from_units(20));
        assert_eq!(alice.level, 0);
        assert_eq!(alice.transfer_enable, 0);
        assert_eq!(db.purchases().count_by_user(alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purchase_exact_balance_reaches_zero() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        fund(&db, &ledger, &alice, Money::from_units(15)).await;
        let goods = db.goods().insert("Basic", Money::from_units(15), 1, 1).await.unwrap();

        let receipt = ledger.purchase(alice.id, &goods.id.to_string()).await.unwrap();
        assert!(receipt.balance.is_zero());
    }

    #[tokio::test]
    async fn test_purchase_unknown_goods() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;

        for good in ["999", "abc", ""] {
            let errors = field_errors(ledger.purchase(alice.id, good).await.unwrap_err());
            assert_eq!(errors.get("good"), Some(&["goods not found".to_string()][..]));
        }
    }

    #[tokio::test]
    async fn test_purchase_level_is_replaced_not_maxed() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        fund(&db, &ledger, &alice, Money::from_units(100)).await;
        let high = db.goods().insert("High", Money::from_units(10), 5, 1).await.unwrap();
        let low = db.goods().insert("Low", Money::from_units(10), 1, 1).await.unwrap();

        ledger.purchase(alice.id, &high.id.to_string()).await.unwrap();
        let receipt = ledger.purchase(alice.id, &low.id.to_string()).await.unwrap();

        assert_eq!(receipt.transfer_enable, 2.0);
        assert_eq!(db.users().require(alice.id).await.unwrap().level, 1);
    }

    // -------------------------------------------------------------------------
    // Invite issuance
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_invite_cap_is_strictly_greater() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        let actor = Actor {
            id: alice.id,
            is_staff: false,
        };

        // cap 5: issuing is allowed while the owner holds 0..=5 codes,
        // so they end up with 6
        for _ in 0..=DEFAULT_INVITECODE_NUM {
            let issued = ledger.issue_invite_code(&actor, "alice").await.unwrap();
            assert_eq!(issued.owner, "alice");
            assert_eq!(issued.code.len(), INVITE_CODE_LENGTH);
        }
        assert_eq!(db.invite_codes().count_by_owner(alice.id).await.unwrap(), 6);

        let errors = field_errors(ledger.issue_invite_code(&actor, "alice").await.unwrap_err());
        assert_eq!(errors.get("owner"), Some(&["max invite codes reached".to_string()][..]));
        assert_eq!(db.invite_codes().count_by_owner(alice.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_invite_staff_bypass() {
        let (db, ledger, admin) = setup().await;
        let actor = Actor {
            id: admin.id,
            is_staff: true,
        };

        for _ in 0..20 {
            ledger.issue_invite_code(&actor, "admin").await.unwrap();
        }
        assert_eq!(db.invite_codes().count_by_owner(admin.id).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_invite_owner_must_exist() {
        let (_db, ledger, admin) = setup().await;
        let actor = Actor {
            id: admin.id,
            is_staff: true,
        };

        let errors = field_errors(ledger.issue_invite_code(&actor, "ghost").await.unwrap_err());
        assert_eq!(errors.get("owner"), Some(&["user does not exist".to_string()][..]));
    }

    #[tokio::test]
    async fn test_invite_for_someone_else_refused() {
        let (db, ledger, admin) = setup().await;
        let alice = register(&db, &ledger, &admin, "alice").await;
        register(&db, &ledger, &admin, "bob").await;
        let actor = Actor {
            id: alice.id,
            is_staff: false,
        };

        let err = ledger.issue_invite_code(&actor, "bob").await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::PermissionDenied)));

        // staff may issue on anyone's behalf
        let staff = Actor {
            id: admin.id,
            is_staff: true,
        };
        assert!(ledger.issue_invite_code(&staff, "bob").await.is_ok());
    }
}
