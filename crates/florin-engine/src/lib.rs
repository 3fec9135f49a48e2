//! # florin-engine: Stateful Promotion and Gift-Card Engine
//!
//! This crate owns the shared state of the accounting engine: the promotion
//! catalog, the gift-card ledger, and the commit path that burns usage and
//! moves balances. All pure pricing and validation logic lives in
//! `florin-core`; this crate adds locking, lifecycle, and delivery.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Florin Engine Data Flow                            │
//! │                                                                         │
//! │  Storefront checkout / admin console                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  florin-engine (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐  │   │
//! │  │   │ PromotionEngine│   │ PromotionCatalog│   │ GiftCardLedger│  │   │
//! │  │   │  (engine.rs)  │──►│  (catalog.rs)  │   │  (ledger.rs)  │  │   │
//! │  │   │               │   └────────────────┘   └───────────────┘  │   │
//! │  │   │  one façade   │   ┌────────────────┐   ┌───────────────┐  │   │
//! │  │   │  per process  │──►│PromotionValidator│ │RedemptionCoord│  │   │
//! │  │   └───────────────┘   │ (validator.rs) │   │(coordinator.rs)│  │   │
//! │  │                       └────────────────┘   └───────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  florin-core (Money, Promotion, GiftCard, discount math, validation)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - The `PromotionEngine` façade an application embeds
//! - [`catalog`] - Promotion CRUD, code lookup, per-user usage ledger
//! - [`validator`] - Side-effect-free checkout decisions
//! - [`ledger`] - Gift-card lifecycle, redemption, and the audit trail
//! - [`coordinator`] - Order-time commit and compensation
//! - [`delivery`] - The `GiftCardNotifier` seam and delivery notices
//! - [`codegen`] - Gift-card code and PIN generation
//!
//! ## Concurrency Model
//!
//! Every promotion and gift card sits behind its own `tokio::sync::RwLock`.
//! Preview paths take read locks; commits take the one entity's write lock
//! and re-check their preconditions inside it. There is no global lock and
//! no cross-entity transaction.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod codegen;
pub mod coordinator;
pub mod delivery;
pub mod engine;
pub mod ledger;
pub mod validator;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::PromotionCatalog;
pub use coordinator::RedemptionCoordinator;
pub use delivery::{DeliveryError, DeliveryNotice, GiftCardNotifier, NullNotifier};
pub use engine::PromotionEngine;
pub use ledger::GiftCardLedger;
pub use validator::PromotionValidator;

// Core types embedders need alongside the engine
pub use florin_core::error::{EngineError, EngineResult};
pub use florin_core::{
    CardValidation, CartLine, GiftCard, GiftCardSummary, Money, NewGiftCard, NewPromotion,
    PaymentInfo, Promotion, PromotionDecision, PromotionUpdate, RedemptionReceipt, Transaction,
};
