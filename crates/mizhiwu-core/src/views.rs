//! # Response Types
//!
//! One response shape per operation. The portal frontend consumes these
//! through the generated TypeScript bindings (`ts-rs`).
//!
//! ## Operation → Response
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ Register                 │ Registered { id, username, email, token }    │
//! │ Charge                   │ ChargeReceipt { user, balance }              │
//! │ Purchase                 │ PurchaseReceipt { user, balance,             │
//! │                          │                   transfer_enable (GB) }     │
//! │ Issue invite code        │ IssuedInviteCode { owner, code }             │
//! │ List/retrieve user       │ UserInfo                                     │
//! │ Proxy config / usage     │ UserSsConfig / UserSsUsage                   │
//! │ List/retrieve invite     │ InviteCodeView                               │
//! │ Catalogue                │ GoodsView                                    │
//! │ Purchase history         │ PurchaseView                                 │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Field names match the existing portal's JSON, so renames here are
//! breaking changes for deployed clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::rules::transfer_in_gb;
use crate::types::{Goods, InviteCode, PurchaseHistory, User};

// =============================================================================
// Flow Results
// =============================================================================

/// Result of a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Registered {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Access token for the new account.
    pub token: String,
}

/// Result of redeeming a money code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChargeReceipt {
    /// Username of the redeemer.
    pub user: String,
    /// Balance after the credit.
    pub balance: Money,
}

/// Result of buying goods.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseReceipt {
    pub user: String,
    /// Balance after the debit.
    pub balance: Money,
    /// New quota in GB.
    pub transfer_enable: f64,
}

impl PurchaseReceipt {
    /// Builds the receipt from the ledger state after the debit.
    pub fn new(user: String, balance: Money, transfer_enable_bytes: i64) -> Self {
        PurchaseReceipt {
            user,
            balance,
            transfer_enable: transfer_in_gb(transfer_enable_bytes),
        }
    }
}

/// Result of issuing an invite code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IssuedInviteCode {
    pub owner: String,
    pub code: String,
}

// =============================================================================
// Account Views
// =============================================================================

/// Public account information.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Username of the referrer.
    pub invite_user: Option<String>,
    pub balance: Money,
    pub level: i64,
    #[ts(as = "Option<String>")]
    pub level_expire_time: Option<DateTime<Utc>>,
    pub theme: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            invite_user: user.invite_user.clone(),
            balance: user.balance,
            level: user.level,
            level_expire_time: user.level_expire_time,
            theme: user.theme.clone(),
        }
    }
}

/// Proxy client configuration for an account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserSsConfig {
    pub username: String,
    pub port: i64,
    pub method: String,
    pub sspasswd: String,
    pub protocol: String,
    pub protocol_param: String,
    pub obfs: String,
    pub obfs_param: String,
}

impl From<&User> for UserSsConfig {
    fn from(user: &User) -> Self {
        UserSsConfig {
            username: user.username.clone(),
            port: user.port,
            method: user.method.clone(),
            sspasswd: user.sspasswd.clone(),
            protocol: user.protocol.clone(),
            protocol_param: user.protocol_param.clone(),
            obfs: user.obfs.clone(),
            obfs_param: user.obfs_param.clone(),
        }
    }
}

/// Proxy usage counters for an account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserSsUsage {
    pub username: String,
    pub enable: bool,
    pub last_use_time: i64,
    pub upload_traffic: i64,
    pub download_traffic: i64,
    /// Quota in bytes.
    pub transfer_enable: i64,
}

impl From<&User> for UserSsUsage {
    fn from(user: &User) -> Self {
        UserSsUsage {
            username: user.username.clone(),
            enable: user.enable,
            last_use_time: user.last_use_time,
            upload_traffic: user.upload_traffic,
            download_traffic: user.download_traffic,
            transfer_enable: user.transfer_enable,
        }
    }
}

// =============================================================================
// Code & Catalogue Views
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InviteCodeView {
    pub id: i64,
    pub code: String,
    /// Username of the owner.
    pub owner: Option<String>,
    pub isused: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl From<&InviteCode> for InviteCodeView {
    fn from(code: &InviteCode) -> Self {
        InviteCodeView {
            id: code.id,
            code: code.code.clone(),
            owner: code.owner.clone(),
            isused: code.isused,
            created_at: code.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GoodsView {
    pub id: i64,
    pub name: String,
    pub number: Money,
    pub level: i64,
    /// GB granted.
    pub transfer: i64,
}

impl From<&Goods> for GoodsView {
    fn from(goods: &Goods) -> Self {
        GoodsView {
            id: goods.id,
            name: goods.name.clone(),
            number: goods.number,
            level: goods.level,
            transfer: goods.transfer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseView {
    pub id: i64,
    pub number: Money,
    /// Goods name at read time; `None` if the goods row was removed.
    pub info: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl From<&PurchaseHistory> for PurchaseView {
    fn from(row: &PurchaseHistory) -> Self {
        PurchaseView {
            id: row.id,
            number: row.number,
            info: row.goods_name.clone(),
            created_at: row.created_at,
        }
    }
}
