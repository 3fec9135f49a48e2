//! # Discount Calculator
//!
//! Pure functions turning a promotion plus a cart into a discount amount.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Discount Computation                                │
//! │                                                                         │
//! │  Promotion + subtotal + cart lines                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  eligible base = restricted? Σ line totals passing applies_to()         │
//! │                  : whole-cart subtotal                                  │
//! │       │                                                                 │
//! │       ├── Percentage ──► base × value / 100, clamp to max cap           │
//! │       ├── Fixed ───────► min(value, base), clamp to max cap             │
//! │       ├── FreeShipping ► amount 0, free_shipping flag for order flow    │
//! │       └── Bogo ────────► Err(BogoUndefined) - rule pending definition   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No state, no clock, no side effects. The validator owns the time/usage
//! gates; this module owns only the arithmetic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;
use crate::promotion::{CartLine, DiscountKind, Promotion};

// =============================================================================
// Results
// =============================================================================

/// A computed discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Monetary discount on the subtotal, in minor units.
    pub amount: Money,
    /// Signals the order flow to zero the shipping line. The engine never
    /// computes shipping itself.
    pub free_shipping: bool,
}

/// Why a discount could not be computed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// Buy-one-get-one has no cart-line rule yet. Callers surface this as
    /// an unsupported-kind rejection rather than guessing an algorithm.
    #[error("bogo promotions have no computed discount rule")]
    BogoUndefined,
}

// =============================================================================
// Calculator
// =============================================================================

/// Computes the discount a promotion grants on a cart.
///
/// When the promotion carries applicability restrictions, the discount is
/// computed per line over the eligible subtotal; an unrestricted promotion
/// discounts the whole-cart subtotal the checkout flow supplied.
pub fn calculate_discount(
    promotion: &Promotion,
    subtotal: Money,
    items: &[CartLine],
) -> Result<Discount, DiscountError> {
    let base = eligible_subtotal(promotion, subtotal, items);

    let amount = match promotion.kind {
        DiscountKind::Percentage => {
            clamp_to_cap(base.percentage(promotion.value), promotion.max_discount_minor)
        }
        DiscountKind::Fixed => clamp_to_cap(
            Money::from_minor(promotion.value).min_of(base),
            promotion.max_discount_minor,
        ),
        DiscountKind::FreeShipping => {
            return Ok(Discount {
                amount: Money::zero(),
                free_shipping: true,
            });
        }
        DiscountKind::Bogo => return Err(DiscountError::BogoUndefined),
    };

    Ok(Discount {
        amount,
        free_shipping: false,
    })
}

/// The portion of the cart the promotion may discount.
fn eligible_subtotal(promotion: &Promotion, subtotal: Money, items: &[CartLine]) -> Money {
    if !promotion.has_restrictions() {
        return subtotal;
    }

    items
        .iter()
        .filter(|line| promotion.applies_to(&line.product_id, &line.category))
        .fold(Money::zero(), |sum, line| sum + line.line_total())
}

fn clamp_to_cap(amount: Money, cap: Option<i64>) -> Money {
    match cap {
        Some(max) => amount.min_of(Money::from_minor(max)),
        None => amount,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
