//! # Promotion Validator
//!
//! Orchestrates lookup, time/usage/eligibility gates, and the discount
//! computation into one checkout-facing decision.
//!
//! ## Gate Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate(code, subtotal, items, user_id)                              │
//! │                                                                         │
//! │  1. normalize + lookup ──────────────── miss ───► NOT_FOUND             │
//! │  2. active flag ─────────────────────── false ──► INACTIVE              │
//! │  3. now < start_date ────────────────── yes ────► NOT_STARTED           │
//! │  4. now > end_date ──────────────────── yes ────► EXPIRED               │
//! │  5. usage_count >= usage_limit ──────── yes ────► USAGE_LIMIT_REACHED   │
//! │  6. user ledger >= per_user_limit ───── yes ────► PER_USER_LIMIT_REACHED│
//! │  7. subtotal < min_purchase ─────────── yes ────► MIN_PURCHASE_NOT_MET  │
//! │  8. discount calculator ─────────────── bogo ───► UNSUPPORTED_KIND      │
//! │                                         └───────► {valid:true, discount}│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each gate short-circuits; the inactive flag wins over every date and
//! usage consideration.
//!
//! ## No Side Effects
//! Validation never touches `usage_count`, so the checkout flow can preview
//! or retry freely. Committing a usage is the redemption coordinator's job,
//! after the order is durably accepted.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use florin_core::discount::{calculate_discount, DiscountError};
use florin_core::validation::normalize_code;
use florin_core::{
    AppliedDiscount, CartLine, Money, PromotionDecision, PromotionRejection,
};

use crate::catalog::PromotionCatalog;

/// The side-effect-free pricing decision for promotion codes.
#[derive(Debug, Clone)]
pub struct PromotionValidator {
    catalog: Arc<PromotionCatalog>,
}

impl PromotionValidator {
    pub fn new(catalog: Arc<PromotionCatalog>) -> Self {
        PromotionValidator { catalog }
    }

    /// Decides whether `code` currently applies to this cart and, if so,
    /// what it is worth.
    pub async fn validate(
        &self,
        code: &str,
        subtotal: Money,
        items: &[CartLine],
        user_id: &str,
    ) -> PromotionDecision {
        // A code that cannot survive normalization cannot match anything.
        let code = match normalize_code(code) {
            Ok(code) => code,
            Err(_) => return PromotionDecision::rejected(PromotionRejection::NotFound),
        };

        let promotion = match self.catalog.find_by_code(&code).await {
            Some(promotion) => promotion,
            None => return PromotionDecision::rejected(PromotionRejection::NotFound),
        };

        if !promotion.active {
            return PromotionDecision::rejected(PromotionRejection::Inactive);
        }

        let now = Utc::now();
        if now < promotion.start_date {
            return PromotionDecision::rejected(PromotionRejection::NotStarted);
        }
        if now > promotion.end_date {
            return PromotionDecision::rejected(PromotionRejection::Expired);
        }

        if promotion.usage_exhausted() {
            return PromotionDecision::rejected(PromotionRejection::UsageLimitReached);
        }

        let user_usage = self.catalog.user_usage(&promotion.id, user_id).await;
        if user_usage >= promotion.per_user_limit {
            return PromotionDecision::rejected(PromotionRejection::PerUserLimitReached);
        }

        if subtotal.minor() < promotion.min_purchase_minor {
            return PromotionDecision::rejected(PromotionRejection::MinPurchaseNotMet);
        }

        let discount = match calculate_discount(&promotion, subtotal, items) {
            Ok(discount) => discount,
            Err(DiscountError::BogoUndefined) => {
                return PromotionDecision::rejected(PromotionRejection::UnsupportedKind);
            }
        };

        debug!(
            code = %promotion.code,
            amount = %discount.amount,
            free_shipping = discount.free_shipping,
            "Promotion validated"
        );

        PromotionDecision::approved(AppliedDiscount {
            promotion_id: promotion.id,
            code: promotion.code,
            amount: discount.amount,
            free_shipping: discount.free_shipping,
            stackable: promotion.stackable,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use florin_core::{DiscountKind, NewPromotion};

    fn setup() -> (Arc<PromotionCatalog>, PromotionValidator) {
        let catalog = Arc::new(PromotionCatalog::new());
        let validator = PromotionValidator::new(catalog.clone());
        (catalog, validator)
    }

    fn save20() -> NewPromotion {
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
        input
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let (_, validator) = setup();
        let decision = validator
            .validate("NOPE", Money::from_minor(1000), &[], "u-1")
            .await;
        assert!(!decision.valid);
        assert_eq!(decision.reason, Some(PromotionRejection::NotFound));
    }

    #[tokio::test]
    async fn test_malformed_code_is_not_found() {
        let (_, validator) = setup();
        let decision = validator
            .validate("no such code!", Money::from_minor(1000), &[], "u-1")
            .await;
        assert_eq!(decision.reason, Some(PromotionRejection::NotFound));
    }

    #[tokio::test]
    async fn test_valid_percentage_with_cap() {
        // SAVE20 (20%, cap 100) on subtotal 1000 yields 100, not 200
        let (catalog, validator) = setup();
        catalog.create(save20()).await.unwrap();

        let decision = validator
            .validate("save20", Money::from_minor(1000), &[], "u-1")
            .await;
        assert!(decision.valid);
        let discount = decision.discount.unwrap();
        assert_eq!(discount.amount.minor(), 100);
        assert!(!discount.free_shipping);
    }

    #[tokio::test]
    async fn test_fixed_clamped_to_subtotal() {
        // FLAT500 (fixed 500) on subtotal 300 yields 300
        let (catalog, validator) = setup();
        let now = Utc::now();
        catalog
            .create(NewPromotion::new(
                "FLAT500",
                "500 off",
                DiscountKind::Fixed,
                500,
                now - Duration::days(1),
                now + Duration::days(1),
            ))
            .await
            .unwrap();

        let decision = validator
            .validate("FLAT500", Money::from_minor(300), &[], "u-1")
            .await;
        assert_eq!(decision.discount.unwrap().amount.minor(), 300);
    }

    #[tokio::test]
    async fn test_inactive_wins_over_everything() {
        // An inactive promotion fails regardless of date window or usage
        let (catalog, validator) = setup();
        let promo = catalog.create(save20()).await.unwrap();
        catalog.deactivate(&promo.id).await.unwrap();

        let decision = validator
            .validate("SAVE20", Money::from_minor(1000), &[], "u-1")
            .await;
        assert_eq!(decision.reason, Some(PromotionRejection::Inactive));
    }

    #[tokio::test]
    async fn test_not_started_and_expired_gates() {
        let (catalog, validator) = setup();
        let now = Utc::now();

        let mut future = save20();
        future.code = "FUTURE".to_string();
        future.start_date = now + Duration::days(1);
        future.end_date = now + Duration::days(2);
        catalog.create(future).await.unwrap();

        let mut past = save20();
        past.code = "PAST".to_string();
        past.start_date = now - Duration::days(2);
        past.end_date = now - Duration::days(1);
        catalog.create(past).await.unwrap();

        let d = validator
            .validate("FUTURE", Money::from_minor(1000), &[], "u-1")
            .await;
        assert_eq!(d.reason, Some(PromotionRejection::NotStarted));

        let d = validator
            .validate("PAST", Money::from_minor(1000), &[], "u-1")
            .await;
        assert_eq!(d.reason, Some(PromotionRejection::Expired));
    }

    #[tokio::test]
    async fn test_usage_limit_gate() {
        let (catalog, validator) = setup();
        let mut input = save20();
        input.usage_limit = Some(5);
        let promo = catalog.create(input).await.unwrap();

        {
            let entry = catalog.entry(&promo.id).await.unwrap();
            entry.write().await.usage_count = 5;
        }

        let decision = validator
            .validate("SAVE20", Money::from_minor(1000), &[], "u-1")
            .await;
        assert_eq!(decision.reason, Some(PromotionRejection::UsageLimitReached));
    }

    #[tokio::test]
    async fn test_per_user_limit_gate() {
        let (catalog, validator) = setup();
        let promo = catalog.create(save20()).await.unwrap(); // per_user_limit = 1
        catalog.record_user_usage(&promo.id, "u-1").await;

        let d = validator
            .validate("SAVE20", Money::from_minor(1000), &[], "u-1")
            .await;
        assert_eq!(d.reason, Some(PromotionRejection::PerUserLimitReached));

        // Other users unaffected
        let d = validator
            .validate("SAVE20", Money::from_minor(1000), &[], "u-2")
            .await;
        assert!(d.valid);
    }

    #[tokio::test]
    async fn test_min_purchase_gate() {
        let (catalog, validator) = setup();
        let mut input = save20();
        input.min_purchase_minor = 2000;
        catalog.create(input).await.unwrap();

        let d = validator
            .validate("SAVE20", Money::from_minor(1999), &[], "u-1")
            .await;
        assert_eq!(d.reason, Some(PromotionRejection::MinPurchaseNotMet));

        let d = validator
            .validate("SAVE20", Money::from_minor(2000), &[], "u-1")
            .await;
        assert!(d.valid);
    }

    #[tokio::test]
    async fn test_bogo_returns_unsupported_kind() {
        let (catalog, validator) = setup();
        let now = Utc::now();
        catalog
            .create(NewPromotion::new(
                "BOGO",
                "Buy one get one",
                DiscountKind::Bogo,
                1,
                now - Duration::days(1),
                now + Duration::days(1),
            ))
            .await
            .unwrap();

        let d = validator
            .validate("BOGO", Money::from_minor(1000), &[], "u-1")
            .await;
        assert_eq!(d.reason, Some(PromotionRejection::UnsupportedKind));
    }

    #[tokio::test]
    async fn test_validate_has_no_side_effects() {
        let (catalog, validator) = setup();
        let promo = catalog.create(save20()).await.unwrap();

        for _ in 0..3 {
            let d = validator
                .validate("SAVE20", Money::from_minor(1000), &[], "u-1")
                .await;
            assert!(d.valid);
        }

        assert_eq!(catalog.get(&promo.id).await.unwrap().usage_count, 0);
        assert_eq!(catalog.user_usage(&promo.id, "u-1").await, 0);
    }
}
