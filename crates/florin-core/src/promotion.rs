//! # Promotion Types
//!
//! Domain types for discount promotions.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Promotion Data Flow                               │
//! │                                                                         │
//! │  Admin action ──► NewPromotion ──► PromotionCatalog.create()            │
//! │                                          │                              │
//! │  Checkout ──► validate(code, cart) ──► Promotion + CartLines            │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                              PromotionDecision                          │
//! │                    {valid:true, discount}  or  {valid:false, reason}    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4 - immutable, referenced by usage records
//! - `code`: business identifier shoppers type in - unique, uppercased

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Discount Kind
// =============================================================================

/// The kind of discount a promotion grants.
///
/// A closed sum type, dispatched exhaustively by the discount calculator.
/// Adding a variant without handling it is a compile error, never a silent
/// zero-discount fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` percent off the eligible subtotal.
    Percentage,
    /// `value` minor units off, never more than the eligible subtotal.
    Fixed,
    /// Buy-one-get-one. No computed discount yet: the cart-line rule is
    /// pending product definition, and the calculator rejects it explicitly.
    Bogo,
    /// Zero monetary discount on the subtotal; the order flow zeroes the
    /// shipping line when it sees the flag.
    FreeShipping,
}

// =============================================================================
// Promotion
// =============================================================================

/// A discount rule addressable by a unique code.
///
/// ## Invariants
/// - `code` is globally unique, trimmed, and uppercased
/// - `start_date < end_date`
/// - `usage_count <= usage_limit` whenever a limit is set
/// - `usage_count` is mutated only by the redemption coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Shopper-facing code, normalized to uppercase.
    pub code: String,

    /// Display name shown in the cart summary.
    pub name: String,

    /// Longer marketing description.
    pub description: String,

    /// Kind of discount this promotion grants.
    pub kind: DiscountKind,

    /// Percentage (for [`DiscountKind::Percentage`]) or amount in minor
    /// units (for [`DiscountKind::Fixed`]). Always >= 0.
    pub value: i64,

    /// Minimum cart subtotal required, in minor units.
    pub min_purchase_minor: i64,

    /// Optional cap on the computed discount, in minor units.
    pub max_discount_minor: Option<i64>,

    /// First instant the promotion is redeemable.
    pub start_date: DateTime<Utc>,

    /// Last instant the promotion is redeemable.
    pub end_date: DateTime<Utc>,

    /// System-wide cap on successful applications. `None` = unlimited.
    pub usage_limit: Option<u32>,

    /// Successful applications so far.
    pub usage_count: u32,

    /// Cap per shopper.
    pub per_user_limit: u32,

    /// Category allow-list. Empty = no category restriction.
    pub applicable_categories: Vec<String>,

    /// Product allow-list. Empty = no product restriction.
    pub applicable_products: Vec<String>,

    /// Product deny-list. Takes precedence over both allow-lists.
    pub excluded_products: Vec<String>,

    /// Whether this promotion may combine with others on one order.
    pub stackable: bool,

    /// Whether this promotion applies without the shopper entering a code.
    pub auto_apply: bool,

    /// Soft-delete / pause flag.
    pub active: bool,

    /// Ordering weight for auto-apply candidates (higher wins).
    pub priority: i32,

    /// When the promotion was created.
    pub created_at: DateTime<Utc>,

    /// When the promotion was last updated by an admin.
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    /// Whether this promotion applies to a given cart line.
    ///
    /// Precedence: exclusion list, then product allow-list, then category
    /// allow-list, then open to the whole catalog.
    pub fn applies_to(&self, product_id: &str, category: &str) -> bool {
        if self
            .excluded_products
            .iter()
            .any(|p| p == product_id)
        {
            return false;
        }
        if !self.applicable_products.is_empty() {
            return self.applicable_products.iter().any(|p| p == product_id);
        }
        if !self.applicable_categories.is_empty() {
            return self.applicable_categories.iter().any(|c| c == category);
        }
        true
    }

    /// Whether any applicability restriction is configured.
    pub fn has_restrictions(&self) -> bool {
        !self.applicable_categories.is_empty()
            || !self.applicable_products.is_empty()
            || !self.excluded_products.is_empty()
    }

    /// Whether the usage limit has been reached.
    pub fn usage_exhausted(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.usage_count >= limit)
    }
}

// =============================================================================
// New Promotion Input
// =============================================================================

/// Admin input for creating a promotion.
///
/// Optional knobs default the way the storefront expects: no minimum
/// purchase, no caps, one use per shopper, not stackable, not auto-applied,
/// active on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPromotion {
    pub code: String,
    pub name: String,
    pub description: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub min_purchase_minor: i64,
    pub max_discount_minor: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    pub per_user_limit: u32,
    pub applicable_categories: Vec<String>,
    pub applicable_products: Vec<String>,
    pub excluded_products: Vec<String>,
    pub stackable: bool,
    pub auto_apply: bool,
    pub priority: i32,
}

impl NewPromotion {
    /// Creates an input with the required fields and default knobs.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        kind: DiscountKind,
        value: i64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        NewPromotion {
            code: code.into(),
            name: name.into(),
            description: String::new(),
            kind,
            value,
            min_purchase_minor: 0,
            max_discount_minor: None,
            start_date,
            end_date,
            usage_limit: None,
            per_user_limit: 1,
            applicable_categories: Vec::new(),
            applicable_products: Vec::new(),
            excluded_products: Vec::new(),
            stackable: false,
            auto_apply: false,
            priority: 0,
        }
    }
}

// =============================================================================
// Promotion Update
// =============================================================================

/// Admin update to an existing promotion. `None` fields are left unchanged.
///
/// `usage_count` is deliberately absent: only the redemption coordinator
/// mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<i64>,
    pub min_purchase_minor: Option<i64>,
    pub max_discount_minor: Option<Option<i64>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<Option<u32>>,
    pub per_user_limit: Option<u32>,
    pub stackable: Option<bool>,
    pub auto_apply: Option<bool>,
    pub active: Option<bool>,
    pub priority: Option<i32>,
}

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the cart the checkout flow hands us for pricing.
///
/// Uses the snapshot pattern: prices here are frozen by the checkout flow,
/// the engine never looks prices up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub category: String,
    /// Unit price in minor units, frozen at add-to-cart time.
    pub unit_price_minor: i64,
    pub quantity: i64,
}

impl CartLine {
    /// Line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        Money::from_minor(self.unit_price_minor).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Validation Decision
// =============================================================================

/// Why a promotion was rejected at checkout.
///
/// These travel back to the checkout UI as values so it can render a
/// specific message; they are never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionRejection {
    NotFound,
    Inactive,
    NotStarted,
    Expired,
    UsageLimitReached,
    PerUserLimitReached,
    MinPurchaseNotMet,
    /// The discount kind has no computed rule yet (buy-one-get-one).
    UnsupportedKind,
}

/// The discount a valid promotion grants on this cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub promotion_id: String,
    pub code: String,
    /// Monetary discount on the subtotal, in minor units.
    pub amount: Money,
    /// The order flow zeroes the shipping line when set.
    pub free_shipping: bool,
    /// Whether this promotion may combine with others.
    pub stackable: bool,
}

/// The outcome of validating a promotion code against a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<AppliedDiscount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<PromotionRejection>,
}

impl PromotionDecision {
    /// A passing decision carrying the computed discount.
    pub fn approved(discount: AppliedDiscount) -> Self {
        PromotionDecision {
            valid: true,
            discount: Some(discount),
            reason: None,
        }
    }

    /// A failing decision carrying a UI-renderable reason.
    pub fn rejected(reason: PromotionRejection) -> Self {
        PromotionDecision {
            valid: false,
            discount: None,
            reason: Some(reason),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
