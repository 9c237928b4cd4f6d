//! # Domain Types
//!
//! Persisted records used throughout the portal.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │   InviteCode    │   │   MoneyCode     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  username       │◄──│  owner          │   │  code           │       │
//! │  │  balance        │   │  code           │   │  number         │       │
//! │  │  level          │   │  isused (latch) │   │  isused (latch) │       │
//! │  │  transfer_enable│   └─────────────────┘   │  user           │       │
//! │  │  invite_user ───┼──► User (referrer)      └─────────────────┘       │
//! │  │  port, ss conf  │                                                    │
//! │  └────────▲────────┘   ┌─────────────────┐   ┌─────────────────┐       │
//! │           │            │     Goods       │   │ PurchaseHistory │       │
//! │           │            │  ─────────────  │   │  ─────────────  │       │
//! │           │            │  number (price) │◄──│  info           │       │
//! │           └────────────┼── level         │   │  number         │       │
//! │                        │  transfer (GB)  │   │  user ──────────┼──►    │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Weak references (`invite_user`, `owner`, `user`) are nullable: the core
//! never deletes users, but an administrator might.
//!
//! Records are internal. What leaves the service is shaped by [`crate::views`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::money::Money;

// =============================================================================
// User
// =============================================================================

/// A portal account, including its proxy pass-through settings.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never serialised.
    pub password_hash: String,
    /// Staff accounts bypass the invite cap and see admin listings.
    pub is_staff: bool,

    // --- ledger ---
    pub balance: Money,
    pub level: i64,
    pub level_expire_time: Option<DateTime<Utc>>,
    /// Quota in bytes.
    pub transfer_enable: i64,

    // --- invite chain ---
    pub invite_user_id: Option<i64>,
    /// Username of the referrer, joined in by the repository.
    pub invite_user: Option<String>,
    /// How many invite codes this user may issue.
    pub invitecode_num: i64,

    // --- proxy pass-through ---
    pub port: i64,
    pub method: String,
    pub sspasswd: String,
    pub protocol: String,
    pub protocol_param: String,
    pub obfs: String,
    pub obfs_param: String,
    pub enable: bool,
    /// Unix timestamp of last proxy use, maintained by the proxy nodes.
    pub last_use_time: i64,
    pub upload_traffic: i64,
    pub download_traffic: i64,

    pub theme: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Whether `actor` may read this account's private views or act for it.
    #[inline]
    pub fn visible_to(&self, actor: &Actor) -> bool {
        actor.can_access(Some(self.id))
    }
}

/// The authenticated account behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub is_staff: bool,
}

impl Actor {
    /// Whether this actor may act on resources owned by `owner_id`.
    #[inline]
    pub fn can_access(&self, owner_id: Option<i64>) -> bool {
        self.is_staff || owner_id == Some(self.id)
    }
}

/// Everything needed to insert an account.
///
/// Built by the registration flow once validation passed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub invite_user_id: Option<i64>,
    pub invitecode_num: i64,
    /// Proxy password handed to the node for this account.
    pub sspasswd: String,
}

// =============================================================================
// Invite Code
// =============================================================================

/// A one-shot registration token owned by an existing user.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InviteCode {
    pub id: i64,
    pub code: String,
    pub owner_id: Option<i64>,
    /// Username of the owner, joined in by the repository.
    pub owner: Option<String>,
    /// One-shot latch: never goes back to false.
    pub isused: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Money Code
// =============================================================================

/// A one-shot balance top-up token.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MoneyCode {
    pub id: i64,
    pub code: String,
    /// Credit value.
    pub number: Money,
    pub isused: bool,
    /// Username of the redeemer.
    pub user: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Goods
// =============================================================================

/// A purchasable service plan.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Goods {
    pub id: i64,
    pub name: String,
    /// Price.
    pub number: Money,
    /// Tier granted.
    pub level: i64,
    /// Quota granted, in GB.
    pub transfer: i64,
}

// =============================================================================
// Purchase History
// =============================================================================

/// Append-only audit row written by every successful purchase.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseHistory {
    pub id: i64,
    pub user_id: i64,
    /// Amount paid.
    pub number: Money,
    /// The goods bought.
    pub goods_id: Option<i64>,
    /// Goods name, joined in by the repository.
    pub goods_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Request Forms
// =============================================================================

/// Registration request body.
///
/// Fields default to empty so a missing field is reported as "required"
/// by validation instead of failing deserialisation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    #[serde(deserialize_with = "form_text")]
    pub username: String,
    #[serde(deserialize_with = "form_text")]
    pub email: String,
    #[serde(deserialize_with = "form_text")]
    pub password: String,
    /// Invite code token.
    #[serde(deserialize_with = "form_text")]
    pub code: String,
}

/// Reads a text form field the way the portal sends it.
///
/// Strings are taken as is and numbers as their decimal text, so
/// `{"code": 123}` means the code `"123"`. `null` reads as empty and is then
/// reported as required. Booleans, arrays and objects are rejected.
///
/// ```rust
/// use mizhiwu_core::RegistrationForm;
///
/// let form: RegistrationForm = serde_json::from_str(r#"{"code": 123, "email": null}"#).unwrap();
/// assert_eq!(form.code, "123");
/// assert!(form.email.is_empty());
/// ```
pub fn form_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct FormText;

    impl<'de> Visitor<'de> for FormText {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(FormText)
}
