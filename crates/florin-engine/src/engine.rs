//! # Engine Façade
//!
//! One constructor wires the catalog, validator, ledger, and coordinator
//! together so an embedding storefront holds a single handle.
//!
//! ## Call Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PromotionEngine                                  │
//! │                                                                         │
//! │  cart preview                   order placement         order undo      │
//! │       │                               │                      │          │
//! │       ▼                               ▼                      ▼          │
//! │  validate_promotion         commit_promotion_usage   reverse_promotion_ │
//! │  check_gift_card            redeem_gift_card         usage              │
//! │  (read locks only)          (write lock + recheck)   refund_gift_card   │
//! │       │                               │                      │          │
//! │       ▼                               ▼                      ▼          │
//! │  PromotionValidator ──► PromotionCatalog ◄── RedemptionCoordinator      │
//! │                          GiftCardLedger  ◄───────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Admin and support tooling (catalog CRUD, cancel, adjust, resend, the
//! expiration sweep) goes through the [`catalog`](PromotionEngine::catalog)
//! and [`gift_cards`](PromotionEngine::gift_cards) accessors.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use florin_core::error::EngineResult;
use florin_core::{
    CardValidation, CartLine, GiftCard, GiftCardSummary, Money, NewGiftCard, PaymentInfo,
    PromotionDecision, RedemptionReceipt, Transaction,
};

use crate::catalog::PromotionCatalog;
use crate::coordinator::RedemptionCoordinator;
use crate::delivery::GiftCardNotifier;
use crate::ledger::GiftCardLedger;
use crate::validator::PromotionValidator;

/// The single handle an embedding application holds.
pub struct PromotionEngine {
    catalog: Arc<PromotionCatalog>,
    ledger: Arc<GiftCardLedger>,
    validator: PromotionValidator,
    coordinator: RedemptionCoordinator,
}

impl PromotionEngine {
    /// Creates an engine with a no-op delivery channel.
    pub fn new() -> Self {
        Self::build(Arc::new(GiftCardLedger::new()))
    }

    /// Creates an engine delivering gift cards through `notifier`.
    pub fn with_notifier(notifier: Arc<dyn GiftCardNotifier>) -> Self {
        Self::build(Arc::new(GiftCardLedger::with_notifier(notifier)))
    }

    fn build(ledger: Arc<GiftCardLedger>) -> Self {
        let catalog = Arc::new(PromotionCatalog::new());
        PromotionEngine {
            validator: PromotionValidator::new(catalog.clone()),
            coordinator: RedemptionCoordinator::new(catalog.clone(), ledger.clone()),
            catalog,
            ledger,
        }
    }

    // =========================================================================
    // Cart Preview (no side effects)
    // =========================================================================

    /// Prices a promotion code against a cart. Safe to call on every cart
    /// change; nothing is consumed.
    pub async fn validate_promotion(
        &self,
        code: &str,
        subtotal: Money,
        items: &[CartLine],
        user_id: &str,
    ) -> PromotionDecision {
        self.validator.validate(code, subtotal, items, user_id).await
    }

    /// Checks whether a gift card is spendable and what it holds.
    pub async fn check_gift_card(&self, code: &str, pin: Option<&str>) -> CardValidation {
        self.ledger.validate(code, pin).await
    }

    // =========================================================================
    // Order Placement and Undo
    // =========================================================================

    /// Burns one usage of a promotion at order placement.
    pub async fn commit_promotion_usage(
        &self,
        promotion_id: &str,
        user_id: &str,
    ) -> EngineResult<()> {
        self.coordinator
            .apply_promotion_usage(promotion_id, user_id)
            .await
    }

    /// Returns the usage slot after a cancellation or refund.
    pub async fn reverse_promotion_usage(
        &self,
        promotion_id: &str,
        user_id: &str,
    ) -> EngineResult<()> {
        self.coordinator
            .reverse_promotion_usage(promotion_id, user_id)
            .await
    }

    /// Debits a gift card for an order, clamped to its balance.
    pub async fn redeem_gift_card(
        &self,
        code: &str,
        amount: Money,
        order_id: &str,
        user_id: &str,
    ) -> EngineResult<RedemptionReceipt> {
        self.coordinator
            .redeem_gift_card(code, amount, order_id, user_id)
            .await
    }

    /// Credits a gift card back for a cancelled or refunded order.
    pub async fn refund_gift_card(
        &self,
        gift_card_id: &str,
        amount: Money,
        order_id: &str,
    ) -> EngineResult<Transaction> {
        self.coordinator
            .refund_gift_card(gift_card_id, amount, order_id)
            .await
    }

    // =========================================================================
    // Gift Card Purchase Flow
    // =========================================================================

    /// Creates a pending gift card awaiting payment.
    pub async fn create_gift_card(&self, input: NewGiftCard) -> EngineResult<GiftCardSummary> {
        self.ledger.create(input).await
    }

    /// Activates a paid gift card and triggers immediate delivery when no
    /// date was scheduled.
    pub async fn activate_gift_card(
        &self,
        id: &str,
        payment: PaymentInfo,
    ) -> EngineResult<GiftCard> {
        self.ledger.activate(id, payment).await
    }

    /// Delivers (or re-delivers) a card through the notification channel.
    pub async fn send_gift_card(&self, id: &str) -> EngineResult<()> {
        self.ledger.send(id).await
    }

    /// Relabels every active card past its expiration date. Intended for a
    /// periodic scheduler owned by the embedding application.
    pub async fn sweep_expired_gift_cards(&self, now: DateTime<Utc>) -> usize {
        self.ledger.check_expired_cards(now).await
    }

    // =========================================================================
    // Component Accessors
    // =========================================================================

    /// The promotion catalog, for admin CRUD and auto-apply listings.
    pub fn catalog(&self) -> &PromotionCatalog {
        &self.catalog
    }

    /// The gift-card ledger, for support tooling (cancel, adjust, resend,
    /// purchaser and recipient listings).
    pub fn gift_cards(&self) -> &GiftCardLedger {
        &self.ledger
    }
}

impl Default for PromotionEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use florin_core::{
        DeliveryMethod, DiscountKind, NewPromotion, PromotionRejection, Purchaser, Recipient,
    };

    fn cart_line(unit_price: i64, quantity: i64) -> CartLine {
        CartLine {
            product_id: "p-1".to_string(),
            category: "beverages".to_string(),
            unit_price_minor: unit_price,
            quantity,
        }
    }

    async fn seed_save20(engine: &PromotionEngine) -> String {
        let now = Utc::now();
        let mut input = NewPromotion::new(
            "SAVE20",
            "20% off",
            DiscountKind::Percentage,
            20,
            now - Duration::days(1),
            now + Duration::days(30),
        );
        input.max_discount_minor = Some(100);
        engine.catalog().create(input).await.unwrap().id
    }

    #[tokio::test]
    async fn test_end_to_end_promotion_flow() {
        let engine = PromotionEngine::new();
        let promotion_id = seed_save20(&engine).await;

        let items = [cart_line(500, 2)];
        let decision = engine
            .validate_promotion("save20", Money::from_minor(1_000), &items, "u-1")
            .await;
        assert!(decision.valid);
        let discount = decision.discount.unwrap();
        // 20% of 1000 is 200, capped at 100
        assert_eq!(discount.amount.minor(), 100);

        engine
            .commit_promotion_usage(&promotion_id, "u-1")
            .await
            .unwrap();
        assert_eq!(
            engine.catalog().get(&promotion_id).await.unwrap().usage_count,
            1
        );

        // Default per-user limit of 1: the same shopper is now rejected
        let decision = engine
            .validate_promotion("SAVE20", Money::from_minor(1_000), &items, "u-1")
            .await;
        assert_eq!(
            decision.reason,
            Some(PromotionRejection::PerUserLimitReached)
        );

        engine
            .reverse_promotion_usage(&promotion_id, "u-1")
            .await
            .unwrap();
        let decision = engine
            .validate_promotion("SAVE20", Money::from_minor(1_000), &items, "u-1")
            .await;
        assert!(decision.valid);
    }

    #[tokio::test]
    async fn test_end_to_end_gift_card_flow() {
        let engine = PromotionEngine::new();

        let summary = engine
            .create_gift_card(NewGiftCard {
                amount: Money::from_minor(50_000),
                currency: "CLP".to_string(),
                design: "birthday".to_string(),
                purchaser: Purchaser {
                    id: "u-buyer".to_string(),
                    name: "Ana".to_string(),
                    email: "ana@example.com".to_string(),
                },
                recipient: Recipient {
                    name: "Berta".to_string(),
                    email: Some("berta@example.com".to_string()),
                    phone: None,
                    message: None,
                },
                delivery_method: DeliveryMethod::Email,
                scheduled_date: None,
                expiration_months: 12,
            })
            .await
            .unwrap();

        // Pending card is visible but not spendable
        assert!(!engine.check_gift_card(&summary.code, None).await.valid);

        engine
            .activate_gift_card(
                &summary.id,
                PaymentInfo {
                    transaction_id: "pay-1".to_string(),
                    method: "card".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(engine.check_gift_card(&summary.code, None).await.valid);

        let receipt = engine
            .redeem_gift_card(&summary.code, Money::from_minor(60_000), "order-1", "u-1")
            .await
            .unwrap();
        assert_eq!(receipt.redeemed_amount.minor(), 50_000);
        assert!(receipt.remaining_balance.is_zero());

        engine
            .refund_gift_card(&summary.id, Money::from_minor(50_000), "order-1")
            .await
            .unwrap();
        let check = engine.check_gift_card(&summary.code, None).await;
        assert!(check.valid);
        assert_eq!(check.balance, Some(Money::from_minor(50_000)));
    }

    #[tokio::test]
    async fn test_sweep_is_reachable_through_facade() {
        let engine = PromotionEngine::new();
        assert_eq!(engine.sweep_expired_gift_cards(Utc::now()).await, 0);
    }
}
