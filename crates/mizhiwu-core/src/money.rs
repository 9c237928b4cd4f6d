//! # Money Module
//!
//! Provides the `Money` type for account balances, code values and prices.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A balance topped up with ten 0.10 codes must read exactly 1.00.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    balance_cents += code_cents    (exact)                              │
//! │    balance_cents -= price_cents   (exact)                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Where Money Flows
//! ```text
//! MoneyCode.number ──► Charge ──► User.balance ──► Purchase ──► PurchaseHistory.number
//!                                                     ▲
//!                                      Goods.number ──┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mizhiwu_core::money::Money;
//!
//! let balance = Money::from_cents(1000);
//! let code = Money::from_cents(5000);
//! assert_eq!(balance.checked_add(code), Some(Money::from_cents(6000)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: matches the SQLite INTEGER column; the ledger never
///   lets a stored balance go negative
/// - **Transparent**: serialises as the bare integer and is stored as one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use mizhiwu_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units (no cents part).
    ///
    /// ## Example
    /// ```rust
    /// use mizhiwu_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(50).cents(), 5000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two values, `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Subtracts `other`, `None` on overflow.
    ///
    /// The charge flow uses this to find the largest balance a code can
    /// still be credited to.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Whether this balance covers `price`.
    ///
    /// ## Example
    /// ```rust
    /// use mizhiwu_core::money::Money;
    ///
    /// let balance = Money::from_cents(2000);
    /// assert!(balance.covers(Money::from_cents(1500)));
    /// assert!(balance.covers(Money::from_cents(2000)));
    /// assert!(!balance.covers(Money::from_cents(3000)));
    /// ```
    #[inline]
    pub const fn covers(&self, price: Money) -> bool {
        self.0 >= price.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with two decimals, without a currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_units(60).to_string(), "60.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);
        assert_eq!(a.checked_add(b), Some(Money::from_cents(1500)));
        assert_eq!(a.checked_sub(b), Some(Money::from_cents(500)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(b), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(b), None);
    }

    #[test]
    fn test_ten_small_codes_add_up_exactly() {
        let dime = Money::from_cents(10);
        let total = (0..10).try_fold(Money::zero(), |acc, _| acc.checked_add(dime));
        assert_eq!(total, Some(Money::from_units(1)));
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(6000)).unwrap();
        assert_eq!(json, "6000");
    }
}
