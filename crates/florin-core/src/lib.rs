//! # florin-core: Pure Business Logic for the Accounting Engine
//!
//! This crate is the **heart** of the promotion and gift-card engine. It
//! contains all business math and domain types as pure code with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Storefront Accounting Engine                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Checkout / Admin / Support callers              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 florin-engine (stateful layer)                  │   │
//! │  │    PromotionCatalog • GiftCardLedger • RedemptionCoordinator    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ florin-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌───────────┐      │   │
//! │  │   │ promotion │ │ giftcard  │ │ discount  │ │ validation│      │   │
//! │  │   │  Promotion│ │ GiftCard  │ │calculator │ │   rules   │      │   │
//! │  │   │  CartLine │ │Transaction│ │  clamps   │ │  checks   │      │   │
//! │  │   └───────────┘ └───────────┘ └───────────┘ └───────────┘      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO LOCKS • NO CLOCK READS • NO RANDOMNESS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer money in minor units (no floating point!)
//! - [`promotion`] - Promotion records, cart lines, validation decisions
//! - [`giftcard`] - Gift cards, transactions, checkout-facing results
//! - [`discount`] - The discount calculator
//! - [`validation`] - Input validation rules
//! - [`error`] - The error taxonomy
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input = same output; `now` is always a
//!    parameter, never read from the clock
//! 2. **Integer money**: every amount is an i64 in minor units
//! 3. **Closed sums**: discount kinds are enum variants dispatched
//!    exhaustively, never strings in an if/else chain
//! 4. **Rejections are values**: shopper-facing failures travel as
//!    `{valid:false, reason}` decisions, not errors

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod giftcard;
pub mod money;
pub mod promotion;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use discount::{calculate_discount, Discount, DiscountError};
pub use error::{EngineError, EngineResult, ValidationError};
pub use giftcard::*;
pub use money::Money;
pub use promotion::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum gift card face value, in currency minor units.
///
/// ## Business Reason
/// Below this the card fees exceed the margin. Matches the storefront's
/// purchase form.
pub const GIFT_CARD_MIN_AMOUNT: i64 = 5_000;

/// Maximum gift card face value, in currency minor units.
///
/// ## Business Reason
/// Caps fraud exposure on stolen payment methods.
pub const GIFT_CARD_MAX_AMOUNT: i64 = 500_000;

/// Maximum accepted length of a promotion or gift-card code.
pub const MAX_CODE_LENGTH: usize = 40;

/// Alphabet used for gift-card codes.
///
/// Excludes visually ambiguous characters (I, O, 0, 1) so codes survive
/// being read over the phone or printed.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Gift-card codes are four groups of four characters: `XXXX-XXXX-XXXX-XXXX`.
pub const CODE_GROUPS: usize = 4;

/// Characters per code group.
pub const CODE_GROUP_LEN: usize = 4;
