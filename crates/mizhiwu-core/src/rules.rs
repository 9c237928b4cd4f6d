//! # Business Rules
//!
//! The decisions behind registration, charging, purchasing and invite
//! issuance, as pure functions.
//!
//! ## Where Each Rule Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Rule → Flow mapping                               │
//! │                                                                         │
//! │  Registration  check_invite_code      found? unused?                   │
//! │                next_service_port      max(port) + {1,2,3}              │
//! │                                                                         │
//! │  Charge        (code latch is a conditional UPDATE in mizhiwu-db)      │
//! │                                                                         │
//! │  Purchase      PurchasePlan::for_goods  price, level, transfer bytes   │
//! │                ensure_affordable        balance >= price               │
//! │                                                                         │
//! │  Invite issue  check_invite_quota     staff bypass, count > cap        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store enforces the same conditions atomically (see the ledger in
//! mizhiwu-db). These functions decide the outcome and build the error when
//! the store refuses a write.

use std::ops::RangeInclusive;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Goods, InviteCode};
use crate::{GB, MAX_SERVICE_PORT};

/// Random increment added to the highest assigned port.
pub const PORT_STEP: RangeInclusive<i64> = 1..=3;

// =============================================================================
// Registration
// =============================================================================

/// Checks that an invite code lookup produced a usable code.
///
/// ## Rules
/// 1. No match → `InviteCodeIncorrect`
/// 2. Match already consumed → `InviteCodeUsed`
///
/// ## Example
/// ```rust
/// use mizhiwu_core::rules::check_invite_code;
/// use mizhiwu_core::CoreError;
///
/// assert!(matches!(check_invite_code(None), Err(CoreError::InviteCodeIncorrect)));
/// ```
pub fn check_invite_code(found: Option<InviteCode>) -> CoreResult<InviteCode> {
    match found {
        None => Err(CoreError::InviteCodeIncorrect),
        Some(code) if code.isused => Err(CoreError::InviteCodeUsed),
        Some(code) => Ok(code),
    }
}

/// Computes the service port for a new account.
///
/// `current_max` is the highest port assigned so far (`None` when there are
/// no accounts yet, in which case `base_port` stands in). `step` must come
/// from [`PORT_STEP`].
///
/// ## Example
/// ```rust
/// use mizhiwu_core::rules::next_service_port;
///
/// assert_eq!(next_service_port(Some(10_005), 10_000, 2).unwrap(), 10_007);
/// assert_eq!(next_service_port(None, 10_000, 1).unwrap(), 10_001);
/// ```
pub fn next_service_port(current_max: Option<i64>, base_port: i64, step: i64) -> CoreResult<i64> {
    let last = current_max.unwrap_or(base_port);
    let step = step.clamp(*PORT_STEP.start(), *PORT_STEP.end());
    let port = last + step;

    if port > MAX_SERVICE_PORT {
        return Err(CoreError::PortsExhausted { last });
    }

    Ok(port)
}

// =============================================================================
// Purchase
// =============================================================================

/// What a purchase does to an account, derived from the goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchasePlan {
    /// Debited from balance.
    pub price: Money,
    /// New level (replaces the current one).
    pub level: i64,
    /// Added to `transfer_enable`.
    pub transfer_bytes: i64,
}

impl PurchasePlan {
    /// Builds the plan for a catalogue entry.
    ///
    /// ## Example
    /// ```rust
    /// use mizhiwu_core::{rules::PurchasePlan, Goods, Money, GB};
    ///
    /// let goods = Goods { id: 1, name: "Basic".into(), number: Money::from_units(15), level: 2, transfer: 10 };
    /// let plan = PurchasePlan::for_goods(&goods).unwrap();
    /// assert_eq!(plan.transfer_bytes, 10 * GB);
    /// ```
    pub fn for_goods(goods: &Goods) -> CoreResult<Self> {
        let transfer_bytes = goods
            .transfer
            .checked_mul(GB)
            .ok_or(CoreError::QuotaOverflow)?;

        Ok(PurchasePlan {
            price: goods.number,
            level: goods.level,
            transfer_bytes,
        })
    }
}

/// Rejects a purchase the balance cannot cover.
///
/// Equal balance and price is allowed (balance ends at zero).
pub fn ensure_affordable(balance: Money, price: Money) -> CoreResult<()> {
    if balance.covers(price) {
        Ok(())
    } else {
        Err(CoreError::InsufficientBalance { balance, price })
    }
}

/// Converts a byte quota into GB for display.
///
/// ## Example
/// ```rust
/// use mizhiwu_core::{rules::transfer_in_gb, GB};
///
/// assert_eq!(transfer_in_gb(15 * GB), 15.0);
/// assert_eq!(transfer_in_gb(GB / 2), 0.5);
/// ```
pub fn transfer_in_gb(bytes: i64) -> f64 {
    bytes as f64 / GB as f64
}

// =============================================================================
// Invite Issuance
// =============================================================================

/// Checks whether `owner` may receive another invite code.
///
/// ## Rules
/// - Staff owners are never rejected
/// - Otherwise rejected when `existing > cap`
///
/// The comparison is strictly greater-than, so an owner with cap `N` ends up
/// holding `N + 1` codes. Existing portals rely on that count, keep it.
pub fn check_invite_quota(owner: &str, owner_is_staff: bool, existing: i64, cap: i64) -> CoreResult<()> {
    if owner_is_staff {
        return Ok(());
    }

    if existing > cap {
        return Err(CoreError::InviteLimitReached {
            owner: owner.to_string(),
            existing,
            cap,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn invite(isused: bool) -> InviteCode {
        InviteCode {
            id: 1,
            code: "INVITE0000000001".to_string(),
            owner_id: Some(7),
            owner: Some("alice".to_string()),
            isused,
            created_at: Utc::now(),
        }
    }

    fn goods(price: i64, level: i64, transfer: i64) -> Goods {
        Goods {
            id: 1,
            name: "Plan".to_string(),
            number: Money::from_units(price),
            level,
            transfer,
        }
    }

    #[test]
    fn test_check_invite_code() {
        assert!(matches!(check_invite_code(None), Err(CoreError::InviteCodeIncorrect)));
        assert!(matches!(
            check_invite_code(Some(invite(true))),
            Err(CoreError::InviteCodeUsed)
        ));
        let code = check_invite_code(Some(invite(false))).unwrap();
        assert_eq!(code.owner_id, Some(7));
    }

    #[test]
    fn test_next_service_port_steps_from_max() {
        for step in PORT_STEP {
            assert_eq!(next_service_port(Some(20_000), 10_000, step).unwrap(), 20_000 + step);
        }
    }

    #[test]
    fn test_next_service_port_clamps_step() {
        assert_eq!(next_service_port(Some(100), 0, 0).unwrap(), 101);
        assert_eq!(next_service_port(Some(100), 0, 9).unwrap(), 103);
    }

    #[test]
    fn test_next_service_port_exhausted() {
        let err = next_service_port(Some(65_534), 10_000, 3).unwrap_err();
        assert!(matches!(err, CoreError::PortsExhausted { last: 65_534 }));
    }

    #[test]
    fn test_purchase_succeeds_when_affordable() {
        // Goods(number=15, level=2, transfer=10) + User(balance=20)
        let plan = PurchasePlan::for_goods(&goods(15, 2, 10)).unwrap();
        assert!(ensure_affordable(Money::from_units(20), plan.price).is_ok());
        assert_eq!(plan.price, Money::from_units(15));
        assert_eq!(plan.level, 2);
        assert_eq!(plan.transfer_bytes, 10 * GB);
    }

    #[test]
    fn test_purchase_rejected_when_short() {
        // Goods(number=30, level=2, transfer=10) + User(balance=20)
        let plan = PurchasePlan::for_goods(&goods(30, 2, 10)).unwrap();
        let err = ensure_affordable(Money::from_units(20), plan.price).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_purchase_exact_balance_allowed() {
        assert!(ensure_affordable(Money::from_units(15), Money::from_units(15)).is_ok());
    }

    #[test]
    fn test_purchase_plan_quota_overflow() {
        let err = PurchasePlan::for_goods(&goods(1, 1, i64::MAX)).unwrap_err();
        assert!(matches!(err, CoreError::QuotaOverflow));
    }

    #[test]
    fn test_invite_quota_is_strictly_greater() {
        // cap 5: holding 5 codes still allows a sixth
        assert!(check_invite_quota("bob", false, 5, 5).is_ok());
        assert!(matches!(
            check_invite_quota("bob", false, 6, 5),
            Err(CoreError::InviteLimitReached { existing: 6, cap: 5, .. })
        ));
    }

    #[test]
    fn test_invite_quota_staff_bypass() {
        assert!(check_invite_quota("root", true, 10_000, 0).is_ok());
    }

    #[test]
    fn test_transfer_in_gb() {
        assert_eq!(transfer_in_gb(0), 0.0);
        assert_eq!(transfer_in_gb(3 * GB), 3.0);
    }
}
