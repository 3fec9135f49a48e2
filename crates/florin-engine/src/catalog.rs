//! # Promotion Catalog
//!
//! Owns the promotion records and their schema invariants: global code
//! uniqueness, required fields, value and date-window rules.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PromotionCatalog                                   │
//! │                                                                         │
//! │  promotions:  id ──► Arc<RwLock<Promotion>>   (per-entity lock)         │
//! │  code_index:  CODE ──► id                     (uniqueness + lookup)     │
//! │  user_usage:  (id, user_id) ──► count         (per-user ledger)         │
//! │                                                                         │
//! │  usage_count and the per-user ledger are mutated ONLY under the         │
//! │  promotion's write lock, by the redemption coordinator.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Promotions referenced by past usage are never hard-deleted; admins
//! deactivate them instead.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use florin_core::error::{EngineError, EngineResult};
use florin_core::validation::{
    normalize_code, validate_date_window, validate_min_purchase, validate_promotion_name,
    validate_promotion_value,
};
use florin_core::{NewPromotion, Promotion, PromotionUpdate, ValidationError};

/// In-memory promotion repository with per-entity locks.
///
/// Read paths clone snapshots; only the coordinator and admin updates take
/// a promotion's write lock.
#[derive(Debug, Default)]
pub struct PromotionCatalog {
    /// Promotion records keyed by id.
    promotions: RwLock<HashMap<String, Arc<RwLock<Promotion>>>>,
    /// Normalized code -> id. Guards global code uniqueness.
    code_index: RwLock<HashMap<String, String>>,
    /// (promotion id, user id) -> successful applications by that user.
    user_usage: RwLock<HashMap<(String, String), u32>>,
}

impl PromotionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Admin Operations
    // =========================================================================

    /// Creates a promotion from admin input.
    ///
    /// Normalizes the code and enforces the schema invariants before
    /// anything is stored: required name, non-negative value and minimum
    /// purchase, start before end, globally unique code.
    pub async fn create(&self, input: NewPromotion) -> EngineResult<Promotion> {
        validate_promotion_name(&input.name)?;
        validate_promotion_value(input.value)?;
        validate_min_purchase(input.min_purchase_minor)?;
        validate_date_window(input.start_date, input.end_date)?;
        let code = normalize_code(&input.code)?;

        let now = Utc::now();
        let promotion = Promotion {
            id: Uuid::new_v4().to_string(),
            code: code.clone(),
            name: input.name.trim().to_string(),
            description: input.description,
            kind: input.kind,
            value: input.value,
            min_purchase_minor: input.min_purchase_minor,
            max_discount_minor: input.max_discount_minor,
            start_date: input.start_date,
            end_date: input.end_date,
            usage_limit: input.usage_limit,
            usage_count: 0,
            per_user_limit: input.per_user_limit,
            applicable_categories: input.applicable_categories,
            applicable_products: input.applicable_products,
            excluded_products: input.excluded_products,
            stackable: input.stackable,
            auto_apply: input.auto_apply,
            active: true,
            priority: input.priority,
            created_at: now,
            updated_at: now,
        };

        // The code index write lock is held across the duplicate check and
        // the insert, so two concurrent creates cannot both claim a code.
        let mut code_index = self.code_index.write().await;
        if code_index.contains_key(&code) {
            return Err(ValidationError::Duplicate {
                field: "code".to_string(),
                value: code,
            }
            .into());
        }
        code_index.insert(code.clone(), promotion.id.clone());
        drop(code_index);

        self.promotions
            .write()
            .await
            .insert(promotion.id.clone(), Arc::new(RwLock::new(promotion.clone())));

        info!(id = %promotion.id, code = %promotion.code, "Promotion created");
        Ok(promotion)
    }

    /// Applies an admin update. `None` fields are left unchanged.
    pub async fn update(&self, id: &str, update: PromotionUpdate) -> EngineResult<Promotion> {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| EngineError::not_found("promotion", id))?;

        let mut promo = entry.write().await;

        if let Some(name) = update.name {
            validate_promotion_name(&name)?;
            promo.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            promo.description = description;
        }
        if let Some(value) = update.value {
            validate_promotion_value(value)?;
            promo.value = value;
        }
        if let Some(min_purchase) = update.min_purchase_minor {
            validate_min_purchase(min_purchase)?;
            promo.min_purchase_minor = min_purchase;
        }
        if let Some(max_discount) = update.max_discount_minor {
            promo.max_discount_minor = max_discount;
        }

        let start = update.start_date.unwrap_or(promo.start_date);
        let end = update.end_date.unwrap_or(promo.end_date);
        validate_date_window(start, end)?;
        promo.start_date = start;
        promo.end_date = end;

        if let Some(usage_limit) = update.usage_limit {
            promo.usage_limit = usage_limit;
        }
        if let Some(per_user_limit) = update.per_user_limit {
            promo.per_user_limit = per_user_limit;
        }
        if let Some(stackable) = update.stackable {
            promo.stackable = stackable;
        }
        if let Some(auto_apply) = update.auto_apply {
            promo.auto_apply = auto_apply;
        }
        if let Some(active) = update.active {
            promo.active = active;
        }
        if let Some(priority) = update.priority {
            promo.priority = priority;
        }
        promo.updated_at = Utc::now();

        debug!(id = %promo.id, code = %promo.code, "Promotion updated");
        Ok(promo.clone())
    }

    /// Soft-deletes a promotion. Preferred over [`delete`](Self::delete)
    /// once the code has been used.
    pub async fn deactivate(&self, id: &str) -> EngineResult<Promotion> {
        self.update(
            id,
            PromotionUpdate {
                active: Some(false),
                ..PromotionUpdate::default()
            },
        )
        .await
    }

    /// Hard-deletes a promotion.
    ///
    /// Permitted only while the promotion has no usage history; a promotion
    /// referenced by past transactions must be deactivated instead.
    pub async fn delete(&self, id: &str) -> EngineResult<()> {
        let mut promotions = self.promotions.write().await;
        let entry = promotions
            .get(id)
            .ok_or_else(|| EngineError::not_found("promotion", id))?;

        let promo = entry.read().await;
        if promo.usage_count > 0 {
            return Err(EngineError::state(
                "promotion",
                id,
                "referenced by usage history",
                "hard-delete",
            ));
        }
        let code = promo.code.clone();
        drop(promo);

        promotions.remove(id);
        self.code_index.write().await.remove(&code);

        info!(id = %id, code = %code, "Promotion hard-deleted");
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Snapshot of a promotion by id.
    pub async fn get(&self, id: &str) -> EngineResult<Promotion> {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| EngineError::not_found("promotion", id))?;
        let promo = entry.read().await;
        Ok(promo.clone())
    }

    /// Snapshot of a promotion by its already-normalized code.
    pub async fn find_by_code(&self, code: &str) -> Option<Promotion> {
        let id = self.code_index.read().await.get(code).cloned()?;
        let entry = self.entry(&id).await?;
        let promo = entry.read().await;
        Some(promo.clone())
    }

    /// Active, in-window, auto-apply promotions sorted by priority (highest
    /// first). The storefront shows these without the shopper typing a code.
    pub async fn auto_apply_candidates(&self, now: DateTime<Utc>) -> Vec<Promotion> {
        let promotions = self.promotions.read().await;
        let mut candidates = Vec::new();
        for entry in promotions.values() {
            let promo = entry.read().await;
            if promo.active
                && promo.auto_apply
                && promo.start_date <= now
                && promo.end_date >= now
                && !promo.usage_exhausted()
            {
                candidates.push(promo.clone());
            }
        }
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
    }

    /// How many times a user has successfully applied a promotion.
    pub async fn user_usage(&self, promotion_id: &str, user_id: &str) -> u32 {
        self.user_usage
            .read()
            .await
            .get(&(promotion_id.to_string(), user_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    // =========================================================================
    // Coordinator Hooks
    // =========================================================================
    // Only the redemption coordinator calls these, holding the promotion's
    // write lock the whole time.

    /// The lockable handle for a promotion.
    pub(crate) async fn entry(&self, id: &str) -> Option<Arc<RwLock<Promotion>>> {
        self.promotions.read().await.get(id).cloned()
    }

    /// Records one successful application by a user.
    pub(crate) async fn record_user_usage(&self, promotion_id: &str, user_id: &str) {
        let mut ledger = self.user_usage.write().await;
        *ledger
            .entry((promotion_id.to_string(), user_id.to_string()))
            .or_insert(0) += 1;
    }

    /// Releases one application by a user (order cancellation compensation).
    pub(crate) async fn release_user_usage(&self, promotion_id: &str, user_id: &str) {
        let mut ledger = self.user_usage.write().await;
        if let Some(count) = ledger.get_mut(&(promotion_id.to_string(), user_id.to_string())) {
            *count = count.saturating_sub(1);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use florin_core::DiscountKind;

    fn new_promo(code: &str) -> NewPromotion {
        let now = Utc::now();
        NewPromotion::new(
            code,
            "Test Promotion",
            DiscountKind::Percentage,
            20,
            now - Duration::days(1),
            now + Duration::days(30),
        )
    }

    #[tokio::test]
    async fn test_create_normalizes_code() {
        let catalog = PromotionCatalog::new();
        let promo = catalog.create(new_promo("  save20 ")).await.unwrap();
        assert_eq!(promo.code, "SAVE20");
        assert!(promo.active);
        assert_eq!(promo.usage_count, 0);

        assert!(catalog.find_by_code("SAVE20").await.is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_code() {
        let catalog = PromotionCatalog::new();
        catalog.create(new_promo("SAVE20")).await.unwrap();

        // Same code after normalization
        let err = catalog.create(new_promo("save20")).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_date_window() {
        let catalog = PromotionCatalog::new();
        let now = Utc::now();
        let mut input = new_promo("BROKEN");
        input.start_date = now + Duration::days(2);
        input.end_date = now + Duration::days(1);

        assert!(catalog.create(input).await.is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_negative_value() {
        let catalog = PromotionCatalog::new();
        let mut input = new_promo("NEG");
        input.value = -5;
        assert!(catalog.create(input).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_deactivate() {
        let catalog = PromotionCatalog::new();
        let promo = catalog.create(new_promo("SAVE20")).await.unwrap();

        let updated = catalog
            .update(
                &promo.id,
                PromotionUpdate {
                    value: Some(25),
                    max_discount_minor: Some(Some(10_000)),
                    ..PromotionUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.value, 25);
        assert_eq!(updated.max_discount_minor, Some(10_000));

        let deactivated = catalog.deactivate(&promo.id).await.unwrap();
        assert!(!deactivated.active);
    }

    #[tokio::test]
    async fn test_update_rejects_inverted_window() {
        let catalog = PromotionCatalog::new();
        let promo = catalog.create(new_promo("SAVE20")).await.unwrap();

        let err = catalog
            .update(
                &promo.id,
                PromotionUpdate {
                    end_date: Some(promo.start_date - Duration::days(1)),
                    ..PromotionUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_usage_history() {
        let catalog = PromotionCatalog::new();
        let promo = catalog.create(new_promo("SAVE20")).await.unwrap();

        // Simulate one committed usage
        {
            let entry = catalog.entry(&promo.id).await.unwrap();
            entry.write().await.usage_count = 1;
        }

        let err = catalog.delete(&promo.id).await.unwrap_err();
        assert!(matches!(err, EngineError::State { .. }));

        // Unused promotion deletes fine and frees its code
        let other = catalog.create(new_promo("OTHER")).await.unwrap();
        catalog.delete(&other.id).await.unwrap();
        assert!(catalog.find_by_code("OTHER").await.is_none());
        assert!(catalog.create(new_promo("OTHER")).await.is_ok());
    }

    #[tokio::test]
    async fn test_auto_apply_candidates_sorted_by_priority() {
        let catalog = PromotionCatalog::new();

        let mut low = new_promo("LOW");
        low.auto_apply = true;
        low.priority = 1;
        catalog.create(low).await.unwrap();

        let mut high = new_promo("HIGH");
        high.auto_apply = true;
        high.priority = 10;
        catalog.create(high).await.unwrap();

        // Not auto-apply: excluded
        catalog.create(new_promo("MANUAL")).await.unwrap();

        let candidates = catalog.auto_apply_candidates(Utc::now()).await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].code, "HIGH");
        assert_eq!(candidates[1].code, "LOW");
    }

    #[tokio::test]
    async fn test_user_usage_ledger() {
        let catalog = PromotionCatalog::new();
        let promo = catalog.create(new_promo("SAVE20")).await.unwrap();

        assert_eq!(catalog.user_usage(&promo.id, "u-1").await, 0);
        catalog.record_user_usage(&promo.id, "u-1").await;
        catalog.record_user_usage(&promo.id, "u-1").await;
        assert_eq!(catalog.user_usage(&promo.id, "u-1").await, 2);
        assert_eq!(catalog.user_usage(&promo.id, "u-2").await, 0);

        catalog.release_user_usage(&promo.id, "u-1").await;
        assert_eq!(catalog.user_usage(&promo.id, "u-1").await, 1);

        // Releasing below zero saturates
        catalog.release_user_usage(&promo.id, "u-2").await;
        assert_eq!(catalog.user_usage(&promo.id, "u-2").await, 0);
    }
}
