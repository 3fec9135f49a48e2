//! # Redemption Coordinator
//!
//! Commit-path counterpart of the preview-only validator. Once an order is
//! placed, this module burns promotion usage and debits gift cards, and
//! undoes both when the order is cancelled.
//!
//! ## Why a Separate Commit Path
//! Preview results go stale: between `validate` at cart time and order
//! placement, another shopper may take the last usage slot or drain the
//! card. Every commit therefore re-checks its precondition under the
//! entity's write lock and fails with a typed error instead of trusting
//! the earlier decision.

use std::sync::Arc;

use tracing::{debug, info};

use florin_core::error::{EngineError, EngineResult};
use florin_core::{Money, RedemptionReceipt, Transaction};

use crate::catalog::PromotionCatalog;
use crate::ledger::GiftCardLedger;

/// Applies and reverses the order-time side effects of promotions and
/// gift cards.
pub struct RedemptionCoordinator {
    catalog: Arc<PromotionCatalog>,
    ledger: Arc<GiftCardLedger>,
}

impl RedemptionCoordinator {
    pub fn new(catalog: Arc<PromotionCatalog>, ledger: Arc<GiftCardLedger>) -> Self {
        RedemptionCoordinator { catalog, ledger }
    }

    // =========================================================================
    // Promotion Usage
    // =========================================================================

    /// Burns one usage of a promotion for an order.
    ///
    /// The global and per-user ceilings are re-checked under the
    /// promotion's write lock, so concurrent commits can never push
    /// `usage_count` past `usage_limit` no matter what the preview said.
    pub async fn apply_promotion_usage(
        &self,
        promotion_id: &str,
        user_id: &str,
    ) -> EngineResult<()> {
        let entry = self
            .catalog
            .entry(promotion_id)
            .await
            .ok_or_else(|| EngineError::not_found("promotion", promotion_id))?;

        let mut promotion = entry.write().await;

        if let Some(limit) = promotion.usage_limit {
            if promotion.usage_count >= limit {
                return Err(EngineError::LimitExceeded {
                    scope: "usage",
                    promotion_id: promotion_id.to_string(),
                    used: promotion.usage_count,
                    limit,
                });
            }
        }

        let user_used = self.catalog.user_usage(promotion_id, user_id).await;
        if user_used >= promotion.per_user_limit {
            return Err(EngineError::LimitExceeded {
                scope: "per-user",
                promotion_id: promotion_id.to_string(),
                used: user_used,
                limit: promotion.per_user_limit,
            });
        }

        // Both counters move while the write lock is held, so a competing
        // commit observes either none or all of this application.
        promotion.usage_count += 1;
        self.catalog.record_user_usage(promotion_id, user_id).await;

        debug!(
            promotion_id = %promotion_id,
            user_id = %user_id,
            usage_count = promotion.usage_count,
            "Promotion usage applied"
        );
        Ok(())
    }

    /// Returns a usage slot after an order cancellation or refund.
    ///
    /// Saturating on both counters: reversing more times than was applied
    /// leaves the counts at zero rather than wrapping.
    pub async fn reverse_promotion_usage(
        &self,
        promotion_id: &str,
        user_id: &str,
    ) -> EngineResult<()> {
        let entry = self
            .catalog
            .entry(promotion_id)
            .await
            .ok_or_else(|| EngineError::not_found("promotion", promotion_id))?;

        let mut promotion = entry.write().await;
        promotion.usage_count = promotion.usage_count.saturating_sub(1);
        self.catalog.release_user_usage(promotion_id, user_id).await;

        info!(
            promotion_id = %promotion_id,
            user_id = %user_id,
            usage_count = promotion.usage_count,
            "Promotion usage reversed"
        );
        Ok(())
    }

    // =========================================================================
    // Gift Card Movement
    // =========================================================================

    /// Debits a gift card for an order. Clamps to the remaining balance;
    /// the receipt reports what was actually taken.
    pub async fn redeem_gift_card(
        &self,
        code: &str,
        amount: Money,
        order_id: &str,
        user_id: &str,
    ) -> EngineResult<RedemptionReceipt> {
        self.ledger.redeem(code, amount, order_id, user_id).await
    }

    /// Credits a gift card back for a cancelled or refunded order.
    pub async fn refund_gift_card(
        &self,
        gift_card_id: &str,
        amount: Money,
        order_id: &str,
    ) -> EngineResult<Transaction> {
        self.ledger.refund(gift_card_id, amount, order_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use florin_core::{
        DeliveryMethod, DiscountKind, GiftCardStatus, NewGiftCard, NewPromotion, PaymentInfo,
        Purchaser, Recipient,
    };

    fn promo(code: &str) -> NewPromotion {
        let now = Utc::now();
        NewPromotion::new(
            code,
            "Test promotion",
            DiscountKind::Percentage,
            10,
            now - Duration::days(1),
            now + Duration::days(30),
        )
    }

    async fn coordinator() -> (Arc<PromotionCatalog>, Arc<GiftCardLedger>, RedemptionCoordinator)
    {
        let catalog = Arc::new(PromotionCatalog::new());
        let ledger = Arc::new(GiftCardLedger::new());
        let coordinator = RedemptionCoordinator::new(catalog.clone(), ledger.clone());
        (catalog, ledger, coordinator)
    }

    async fn funded_card(ledger: &GiftCardLedger, amount: i64) -> String {
        let summary = ledger
            .create(NewGiftCard {
                amount: Money::from_minor(amount),
                currency: "CLP".to_string(),
                design: "classic".to_string(),
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
        ledger
            .activate(
                &summary.id,
                PaymentInfo {
                    transaction_id: "pay-1".to_string(),
                    method: "card".to_string(),
                },
            )
            .await
            .unwrap();
        summary.code
    }

    #[tokio::test]
    async fn test_apply_and_reverse_usage() {
        let (catalog, _ledger, coordinator) = coordinator().await;
        let mut input = promo("SAVE10");
        input.usage_limit = Some(5);
        input.per_user_limit = 2;
        let promotion = catalog.create(input).await.unwrap();

        coordinator
            .apply_promotion_usage(&promotion.id, "u-1")
            .await
            .unwrap();
        assert_eq!(catalog.get(&promotion.id).await.unwrap().usage_count, 1);
        assert_eq!(catalog.user_usage(&promotion.id, "u-1").await, 1);

        coordinator
            .reverse_promotion_usage(&promotion.id, "u-1")
            .await
            .unwrap();
        assert_eq!(catalog.get(&promotion.id).await.unwrap().usage_count, 0);
        assert_eq!(catalog.user_usage(&promotion.id, "u-1").await, 0);
    }

    #[tokio::test]
    async fn test_usage_limit_enforced_on_commit() {
        let (catalog, _ledger, coordinator) = coordinator().await;
        let mut input = promo("LAST2");
        input.usage_limit = Some(2);
        input.per_user_limit = 10;
        let promotion = catalog.create(input).await.unwrap();

        coordinator
            .apply_promotion_usage(&promotion.id, "u-1")
            .await
            .unwrap();
        coordinator
            .apply_promotion_usage(&promotion.id, "u-2")
            .await
            .unwrap();

        let err = coordinator
            .apply_promotion_usage(&promotion.id, "u-3")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::LimitExceeded { scope: "usage", .. }
        ));
        assert_eq!(catalog.get(&promotion.id).await.unwrap().usage_count, 2);
    }

    #[tokio::test]
    async fn test_per_user_limit_enforced_on_commit() {
        let (catalog, _ledger, coordinator) = coordinator().await;
        let mut input = promo("ONEPER");
        input.per_user_limit = 1;
        let promotion = catalog.create(input).await.unwrap();

        coordinator
            .apply_promotion_usage(&promotion.id, "u-1")
            .await
            .unwrap();
        let err = coordinator
            .apply_promotion_usage(&promotion.id, "u-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::LimitExceeded {
                scope: "per-user",
                ..
            }
        ));

        // A different shopper still gets a slot
        coordinator
            .apply_promotion_usage(&promotion.id, "u-2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reverse_saturates_at_zero() {
        let (catalog, _ledger, coordinator) = coordinator().await;
        let promotion = catalog.create(promo("SATURATE")).await.unwrap();

        coordinator
            .reverse_promotion_usage(&promotion.id, "u-1")
            .await
            .unwrap();
        assert_eq!(catalog.get(&promotion.id).await.unwrap().usage_count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_applies_never_exceed_limit() {
        let (catalog, _ledger, coordinator) = coordinator().await;
        let mut input = promo("RACE");
        input.usage_limit = Some(10);
        input.per_user_limit = 100;
        let promotion = catalog.create(input).await.unwrap();

        let coordinator = Arc::new(coordinator);
        let mut handles = Vec::new();
        for i in 0..50 {
            let coordinator = coordinator.clone();
            let promotion_id = promotion.id.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .apply_promotion_usage(&promotion_id, &format!("u-{i}"))
                    .await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                applied += 1;
            }
        }

        assert_eq!(applied, 10);
        assert_eq!(catalog.get(&promotion.id).await.unwrap().usage_count, 10);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_redemptions_never_overdraw() {
        let (_catalog, ledger, coordinator) = coordinator().await;
        let code = funded_card(&ledger, 50_000).await;

        let coordinator = Arc::new(coordinator);
        let first = {
            let coordinator = coordinator.clone();
            let code = code.clone();
            tokio::spawn(async move {
                coordinator
                    .redeem_gift_card(&code, Money::from_minor(30_000), "order-1", "u-1")
                    .await
            })
        };
        let second = {
            let coordinator = coordinator.clone();
            let code = code.clone();
            tokio::spawn(async move {
                coordinator
                    .redeem_gift_card(&code, Money::from_minor(30_000), "order-2", "u-2")
                    .await
            })
        };

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        // One side gets the full 30_000, the other the 20_000 remainder
        let total = first.redeemed_amount + second.redeemed_amount;
        assert_eq!(total.minor(), 50_000);

        let card = ledger.find_by_code(&code).await.unwrap();
        assert!(card.balance.is_zero());
        assert_eq!(card.status, GiftCardStatus::Used);
    }

    #[tokio::test]
    async fn test_refund_round_trip_through_coordinator() {
        let (_catalog, ledger, coordinator) = coordinator().await;
        let code = funded_card(&ledger, 50_000).await;
        let card = ledger.find_by_code(&code).await.unwrap();

        coordinator
            .redeem_gift_card(&code, Money::from_minor(20_000), "order-1", "u-1")
            .await
            .unwrap();
        coordinator
            .refund_gift_card(&card.id, Money::from_minor(20_000), "order-1")
            .await
            .unwrap();

        let card = ledger.find_by_code(&code).await.unwrap();
        assert_eq!(card.balance.minor(), 50_000);
    }
}
