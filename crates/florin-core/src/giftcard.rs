//! # Gift Card Types
//!
//! Domain types for balance-bearing digital gift cards and their append-only
//! transaction history.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Gift Card Lifecycle                                │
//! │                                                                         │
//! │   create() ──► PENDING ──activate()──► ACTIVE ──redeem to 0──► USED     │
//! │                   │                      │  ▲                    │      │
//! │                   │                sweep │  │ adjust/refund      │      │
//! │                   │                      ▼  │ (balance > 0)      │      │
//! │                   │                   EXPIRED                    │      │
//! │                   │                                              │      │
//! │                   └───────────── cancel() ◄──────── (not from USED)     │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │                                 CANCELLED (terminal)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `0 <= balance <= original_amount` at all times
//! - Balance decreases only through redemption or admin adjustment
//! - A cancelled card never re-enters any other state
//! - A card past `expiration_date` never redeems, even before the sweep runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Status Enums
// =============================================================================

/// The lifecycle state of a gift card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftCardStatus {
    /// Created, awaiting payment.
    Pending,
    /// Paid and redeemable.
    Active,
    /// Balance exhausted. Admin adjustment or refund can reactivate.
    Used,
    /// Past the expiration date.
    Expired,
    /// Terminal. Cancelled by support.
    Cancelled,
}

impl fmt::Display for GiftCardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GiftCardStatus::Pending => "pending",
            GiftCardStatus::Active => "active",
            GiftCardStatus::Used => "used",
            GiftCardStatus::Expired => "expired",
            GiftCardStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// How the card is delivered to the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    Sms,
    Print,
}

/// Delivery tracking state, independent of card status.
///
/// A failed delivery never rolls back activation; the card stays active and
/// delivery stays pending for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Scheduled,
    Sent,
}

// =============================================================================
// Embedded Records
// =============================================================================

/// Who bought the card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchaser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Who receives the card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Delivery channel and tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub method: DeliveryMethod,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
}

/// Payment confirmation recorded at activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub transaction_id: String,
    pub method: String,
}

/// Receipt recorded when support cancels a card, including the remaining
/// balance that is refundable to the purchaser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationReceipt {
    pub reason: String,
    pub cancelled_by: String,
    pub cancelled_at: DateTime<Utc>,
    pub previous_status: GiftCardStatus,
    pub refundable: Money,
}

// =============================================================================
// Transaction
// =============================================================================

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A debit tied to an order.
    Redemption,
    /// An admin balance override.
    Adjustment,
    /// A compensation credit for a cancelled or refunded order.
    Refund,
}

/// One append-only entry in a gift card's audit trail.
///
/// Never mutated or removed. The card's balance must always reduce to
/// `original_amount` plus the signed sum of these entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub gift_card_id: String,
    pub gift_card_code: String,
    /// Magnitude of the balance change, in minor units.
    pub amount: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
    /// Order this entry compensates or debits for. Redemptions and refunds
    /// only.
    pub order_id: Option<String>,
    /// Shopper who redeemed, when known.
    pub user_id: Option<String>,
    /// Admin who adjusted, for adjustments.
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Gift Card
// =============================================================================

/// A prepaid balance instrument redeemable against orders until exhausted,
/// expired, or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCard {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Grouped alphanumeric code (`XXXX-XXXX-XXXX-XXXX`), ambiguity-free
    /// alphabet, unique.
    pub code: String,

    /// Four-digit security PIN. Never included in summaries.
    pub security_pin: String,

    /// Face value at purchase time.
    pub original_amount: Money,

    /// Remaining balance. Always within `[0, original_amount]`.
    pub balance: Money,

    /// ISO currency code.
    pub currency: String,

    /// Card artwork reference chosen by the purchaser.
    pub design: String,

    pub purchaser: Purchaser,
    pub recipient: Recipient,
    pub delivery: Delivery,

    pub status: GiftCardStatus,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub expiration_date: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,

    /// Payment confirmation, stamped at activation.
    pub payment: Option<PaymentInfo>,

    /// Cancellation receipt, stamped by support.
    pub cancellation: Option<CancellationReceipt>,

    /// Ordered, append-only usage history.
    pub usage_history: Vec<Transaction>,
}

impl GiftCard {
    /// Whether the card is past its expiration date at `now`.
    ///
    /// This inline check takes precedence over the periodic sweep: a card
    /// one millisecond past expiry fails validation even if its status
    /// still reads active.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now
    }

    /// The code with the middle groups masked, for purchaser-facing lists.
    ///
    /// `ABCD-EFGH-JKLM-NPQR` becomes `ABCD-****-****-NPQR`.
    pub fn masked_code(&self) -> String {
        match (self.code.get(..4), self.code.get(15..)) {
            (Some(head), Some(tail)) => format!("{head}-****-****-{tail}"),
            _ => "****".to_string(),
        }
    }
}

// =============================================================================
// New Gift Card Input
// =============================================================================

/// Purchase-flow input for creating a gift card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGiftCard {
    /// Face value in minor units. Bounds enforced by the ledger.
    pub amount: Money,
    pub currency: String,
    pub design: String,
    pub purchaser: Purchaser,
    pub recipient: Recipient,
    pub delivery_method: DeliveryMethod,
    /// Deliver on this date instead of immediately after activation.
    pub scheduled_date: Option<DateTime<Utc>>,
    /// Months until expiry, from creation.
    pub expiration_months: u32,
}

/// What the purchase flow gets back. Deliberately excludes the PIN and the
/// recipient's copy of the full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardSummary {
    pub id: String,
    pub code: String,
    pub amount: Money,
    pub design: String,
    pub recipient_name: String,
    pub expiration_date: DateTime<Utc>,
    pub status: GiftCardStatus,
}

impl From<&GiftCard> for GiftCardSummary {
    fn from(card: &GiftCard) -> Self {
        GiftCardSummary {
            id: card.id.clone(),
            code: card.code.clone(),
            amount: card.original_amount,
            design: card.design.clone(),
            recipient_name: card.recipient.name.clone(),
            expiration_date: card.expiration_date,
            status: card.status,
        }
    }
}

// =============================================================================
// Checkout-Facing Results
// =============================================================================

/// Why a gift card failed validation at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GiftCardRejection {
    UnknownCode,
    PinMismatch,
    NotActivated,
    Cancelled,
    Expired,
    ZeroBalance,
}

/// The outcome of validating a gift card code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GiftCardRejection>,
}

impl CardValidation {
    /// A passing validation carrying the spendable balance.
    pub fn approved(balance: Money, expiration_date: DateTime<Utc>) -> Self {
        CardValidation {
            valid: true,
            balance: Some(balance),
            expiration_date: Some(expiration_date),
            reason: None,
        }
    }

    /// A failing validation carrying a UI-renderable reason.
    pub fn rejected(reason: GiftCardRejection) -> Self {
        CardValidation {
            valid: false,
            balance: None,
            expiration_date: None,
            reason: Some(reason),
        }
    }
}

/// The outcome of a successful redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    /// How much was actually debited (never more than the balance).
    pub redeemed_amount: Money,
    pub remaining_balance: Money,
    pub transaction_id: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
