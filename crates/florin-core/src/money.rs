//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A gift-card ledger that drifts by fractions of a cent cannot be        │
//! │  reconciled against its transaction history.                            │
//! │                                                                         │
//! │  OUR SOLUTION: integer minor units (cents, CLP pesos, ...)              │
//! │    Every balance, discount, and debit is an i64 in the smallest unit.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use florin_core::money::Money;
//!
//! let subtotal = Money::from_minor(10_000);
//! let discount = subtotal.percentage(20); // 2_000
//! assert_eq!((subtotal - discount).minor(), 8_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents, pesos, ...).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results of compensation math may dip
///   negative before clamping; the stored ledger never does
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **No float constructor**: `Money` is never built from an f64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (the smallest currency unit).
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the smaller of two amounts.
    ///
    /// This is the clamp at the heart of gift-card redemption:
    /// `redeemed = requested.min_of(balance)`.
    #[inline]
    pub fn min_of(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Computes `pct` percent of this amount with round-half-up integer math.
    ///
    /// Intermediate math is done in i128 to prevent overflow on large
    /// amounts, the same way the tax formula in the till does it.
    ///
    /// ## Example
    /// ```rust
    /// use florin_core::money::Money;
    ///
    /// let subtotal = Money::from_minor(1000);
    /// assert_eq!(subtotal.percentage(20).minor(), 200);
    /// // Rounding: 15% of 333 = 49.95 → 50
    /// assert_eq!(Money::from_minor(333).percentage(15).minor(), 50);
    /// ```
    pub fn percentage(&self, pct: i64) -> Money {
        let minor = (self.0 as i128 * pct as i128 + 50) / 100;
        Money::from_minor(minor as i64)
    }

    /// Multiplies money by a quantity (line totals).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows the raw minor-unit amount.
///
/// Currency-aware formatting belongs to the storefront UI, which knows the
/// tenant's locale; this is for logs and debugging only.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
