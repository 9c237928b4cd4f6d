//! # mizhiwu-core: Account Rules for the Mizhiwu Portal
//!
//! Everything the portal decides about accounts, codes and purchases,
//! expressed as pure functions over plain data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizhiwu Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Portal frontend                              │   │
//! │  │    Sign up ──► Top up ──► Buy plan ──► Share invite codes      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    auth, routing, permission checks, error → status mapping     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mizhiwu-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   rules   │  │ validation│  │   │
//! │  │   │   User    │  │   Money   │  │  ports    │  │  username │  │   │
//! │  │   │ InviteCode│  │  (cents)  │  │  quota    │  │  email    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mizhiwu-db (Ledger & Storage)                   │   │
//! │  │        SQLite, migrations, repositories, atomic flows           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persisted records (User, InviteCode, MoneyCode, Goods, ...)
//! - [`money`] - Integer-cent Money type
//! - [`rules`] - Invite, port, purchase and quota decisions
//! - [`validation`] - Input shape checks
//! - [`views`] - Response shapes, exported to TypeScript
//! - [`error`] - Domain error types and per-field error lists
//!
//! ## Example Usage
//!
//! ```rust
//! use mizhiwu_core::rules::{ensure_affordable, PurchasePlan};
//! use mizhiwu_core::{Goods, Money};
//!
//! let goods = Goods { id: 1, name: "Basic".into(), number: Money::from_units(15), level: 2, transfer: 10 };
//! let plan = PurchasePlan::for_goods(&goods).unwrap();
//!
//! assert!(ensure_affordable(Money::from_units(20), plan.price).is_ok());
//! assert!(ensure_affordable(Money::from_units(10), plan.price).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod rules;
pub mod types;
pub mod validation;
pub mod views;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, FieldErrors, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Bytes per GB of transfer quota.
pub const GB: i64 = 1024 * 1024 * 1024;

/// Highest assignable service port.
pub const MAX_SERVICE_PORT: i64 = 65_535;

/// Port the allocator counts up from when no account exists yet.
pub const DEFAULT_BASE_PORT: i64 = 10_000;

/// Invite code cap given to new accounts.
pub const DEFAULT_INVITECODE_NUM: i64 = 5;

/// Length of generated invite codes.
pub const INVITE_CODE_LENGTH: usize = 16;

/// Length of generated proxy passwords.
pub const SS_PASSWORD_LENGTH: usize = 8;

/// How many times registration retries after losing a port race.
pub const MAX_PORT_ATTEMPTS: usize = 5;
