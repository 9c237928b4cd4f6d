//! # Repository Module
//!
//! Read access and plain inserts for each table.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.users().get_by_id(7)                                       │
//! │       ▼                                                                 │
//! │  UserRepository ─────────┐                                             │
//! │  InviteCodeRepository    │  SQL lives here                             │
//! │  MoneyCodeRepository     │  (runtime-checked sqlx queries)             │
//! │  GoodsRepository         │                                             │
//! │  PurchaseRepository ─────┘                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! │                                                                         │
//! │  State-changing flows do NOT go through repositories: they run inside  │
//! │  one transaction in crate::ledger.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Accounts (with referrer username joined in)
//! - [`invite_code::InviteCodeRepository`] - Invite codes (with owner username)
//! - [`money_code::MoneyCodeRepository`] - Top-up codes
//! - [`goods::GoodsRepository`] - Catalogue
//! - [`purchase::PurchaseRepository`] - Purchase history

pub mod goods;
pub mod invite_code;
pub mod money_code;
pub mod purchase;
pub mod user;
