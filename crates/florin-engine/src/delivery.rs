//! # Delivery Seam
//!
//! The notification collaborator that carries a gift card to its recipient.
//!
//! The engine only decides *what* to deliver and *when*; transport (email
//! template rendering, SMS gateways) belongs to the notification service.
//! Delivery is fire-and-forget from the ledger's point of view: a failed
//! delivery is logged and leaves the card's delivery status pending, it
//! never rolls back activation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use florin_core::{DeliveryMethod, Money};

/// Everything the notification channel needs to render and send a card.
///
/// Deliberately excludes the security PIN; the PIN travels to the purchaser
/// through the purchase receipt, not the recipient notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryNotice {
    pub gift_card_id: String,
    pub code: String,
    pub amount: Money,
    pub currency: String,
    pub design: String,
    pub method: DeliveryMethod,
    pub recipient_name: String,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub purchaser_name: String,
    pub message: Option<String>,
}

/// Transport failure reported by the notification channel.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("recipient rejected by channel: {0}")]
    RecipientRejected(String),
}

/// The notification collaborator.
///
/// Implementations live outside this crate (email service, SMS gateway).
/// They must be cheap to call concurrently; the ledger does not serialize
/// deliveries.
#[async_trait]
pub trait GiftCardNotifier: Send + Sync {
    async fn deliver(&self, notice: &DeliveryNotice) -> Result<(), DeliveryError>;
}

/// A notifier that silently accepts every notice.
///
/// Default for embeddings that wire delivery elsewhere, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl GiftCardNotifier for NullNotifier {
    async fn deliver(&self, _notice: &DeliveryNotice) -> Result<(), DeliveryError> {
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_notifier_accepts_everything() {
        let notice = DeliveryNotice {
            gift_card_id: "gc-1".to_string(),
            code: "ABCD-EFGH-JKLM-NPQR".to_string(),
            amount: Money::from_minor(25_000),
            currency: "CLP".to_string(),
            design: "classic".to_string(),
            method: DeliveryMethod::Email,
            recipient_name: "Berta".to_string(),
            recipient_email: Some("berta@example.com".to_string()),
            recipient_phone: None,
            purchaser_name: "Ana".to_string(),
            message: None,
        };
        assert!(NullNotifier.deliver(&notice).await.is_ok());
    }
}
