//! # Gift Card Ledger
//!
//! Owns the gift-card entities and every balance-mutating operation:
//! create, activate, redeem, refund, adjust, cancel, plus code/PIN
//! generation and the expiration sweep.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GiftCardLedger                                   │
//! │                                                                         │
//! │  cards:        id ──► Arc<RwLock<GiftCard>>   (per-card lock)           │
//! │  code_index:   CODE ──► id                    (uniqueness + lookup)     │
//! │  transactions: Vec<Transaction>               (append-only audit trail) │
//! │  notifier:     Arc<dyn GiftCardNotifier>      (delivery collaborator)   │
//! │                                                                         │
//! │  A debit and its transaction record are appended inside the SAME        │
//! │  card write-lock critical section: no half-applied mutation is ever     │
//! │  observable.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! `redeem`, `refund`, `adjust_balance`, `cancel`, and the sweep's per-card
//! relabel all take the card's write lock, so two concurrent redemptions of
//! the same code can never jointly overshoot the balance. Unrelated cards
//! mutate fully in parallel. `validate` is a pure read and takes no
//! exclusive lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use florin_core::error::{EngineError, EngineResult};
use florin_core::validation::{
    normalize_code, validate_gift_card_amount, validate_adjusted_balance,
    validate_recipient_contact,
};
use florin_core::{
    CancellationReceipt, CardValidation, Delivery, DeliveryStatus, GiftCard, GiftCardRejection,
    GiftCardStatus, GiftCardSummary, Money, NewGiftCard, PaymentInfo, RedemptionReceipt,
    Transaction, TransactionKind, ValidationError,
};

use crate::codegen::{random_code, random_pin, MAX_CODE_ATTEMPTS};
use crate::delivery::{DeliveryNotice, GiftCardNotifier, NullNotifier};

/// In-memory gift-card repository with per-card locks and an append-only
/// transaction trail.
pub struct GiftCardLedger {
    cards: RwLock<HashMap<String, Arc<RwLock<GiftCard>>>>,
    /// Code -> id. Guards code uniqueness during generation.
    code_index: RwLock<HashMap<String, String>>,
    /// Global append-only mirror of every card's usage history.
    transactions: RwLock<Vec<Transaction>>,
    notifier: Arc<dyn GiftCardNotifier>,
}

impl GiftCardLedger {
    /// Creates a ledger with a no-op delivery channel.
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(NullNotifier))
    }

    /// Creates a ledger wired to a delivery collaborator.
    pub fn with_notifier(notifier: Arc<dyn GiftCardNotifier>) -> Self {
        GiftCardLedger {
            cards: RwLock::new(HashMap::new()),
            code_index: RwLock::new(HashMap::new()),
            transactions: RwLock::new(Vec::new()),
            notifier,
        }
    }

    // =========================================================================
    // Purchase Flow
    // =========================================================================

    /// Creates a gift card in `pending`, awaiting payment.
    ///
    /// Enforces the purchase bounds and the recipient-contact requirement
    /// of the chosen delivery method, then generates a unique code and PIN.
    pub async fn create(&self, input: NewGiftCard) -> EngineResult<GiftCardSummary> {
        validate_gift_card_amount(input.amount)?;
        validate_recipient_contact(&input.recipient, input.delivery_method)?;
        if input.expiration_months == 0 {
            return Err(ValidationError::MustBePositive {
                field: "expiration_months".to_string(),
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let code = self.claim_unique_code(&id).await?;

        let now = Utc::now();
        let card = GiftCard {
            id: id.clone(),
            code,
            security_pin: random_pin(),
            original_amount: input.amount,
            balance: input.amount,
            currency: input.currency,
            design: input.design,
            purchaser: input.purchaser,
            recipient: input.recipient,
            delivery: Delivery {
                method: input.delivery_method,
                scheduled_date: input.scheduled_date,
                sent_at: None,
                status: if input.scheduled_date.is_some() {
                    DeliveryStatus::Scheduled
                } else {
                    DeliveryStatus::Pending
                },
            },
            status: GiftCardStatus::Pending,
            created_at: now,
            activated_at: None,
            // Months are approximated as 30-day blocks; the storefront
            // quotes "valid for N months" with the exact date on the card.
            expiration_date: now + Duration::days(30 * input.expiration_months as i64),
            last_used_at: None,
            payment: None,
            cancellation: None,
            usage_history: Vec::new(),
        };

        let summary = GiftCardSummary::from(&card);
        self.cards
            .write()
            .await
            .insert(id.clone(), Arc::new(RwLock::new(card)));

        info!(id = %id, code = %summary.code, amount = %summary.amount, "Gift card created");
        Ok(summary)
    }

    /// Activates a pending card after payment and triggers delivery when no
    /// scheduled date was requested.
    ///
    /// Delivery failure is logged and leaves delivery status pending; it
    /// never rolls back the activation.
    pub async fn activate(&self, id: &str, payment: PaymentInfo) -> EngineResult<GiftCard> {
        let entry = self.entry(id).await?;

        let (snapshot, deliver_now) = {
            let mut card = entry.write().await;
            if card.status != GiftCardStatus::Pending {
                return Err(EngineError::state(
                    "gift card",
                    id,
                    card.status.to_string(),
                    "activate",
                ));
            }

            card.status = GiftCardStatus::Active;
            card.activated_at = Some(Utc::now());
            card.payment = Some(payment);

            (card.clone(), card.delivery.scheduled_date.is_none())
        };

        info!(id = %id, code = %snapshot.code, "Gift card activated");

        if deliver_now {
            if let Err(err) = self.send(id).await {
                warn!(id = %id, error = %err, "Gift card delivery failed; activation kept");
            }
        }

        self.get(id).await
    }

    // =========================================================================
    // Validation and Redemption
    // =========================================================================

    /// Checks whether a card is currently spendable. Pure read, no side
    /// effects; preview-safe.
    ///
    /// Expiry is checked inline against `expiration_date`, so a card the
    /// sweep has not yet relabeled still fails here.
    pub async fn validate(&self, code: &str, pin: Option<&str>) -> CardValidation {
        let card = match self.find_by_code(code).await {
            Some(card) => card,
            None => return CardValidation::rejected(GiftCardRejection::UnknownCode),
        };

        match check_spendable(&card, pin, Utc::now()) {
            None => CardValidation::approved(card.balance, card.expiration_date),
            Some(reason) => CardValidation::rejected(reason),
        }
    }

    /// Balance inquiry for the shopper-facing "check my card" form.
    pub async fn check_balance(&self, code: &str, pin: Option<&str>) -> CardValidation {
        self.validate(code, pin).await
    }

    /// Debits a card for an order.
    ///
    /// Re-runs the spendability checks under the card's write lock (the
    /// preview result may be stale), clamps the debit to the remaining
    /// balance, appends the redemption transaction in the same critical
    /// section, and drives the card to `used` when the balance hits zero.
    pub async fn redeem(
        &self,
        code: &str,
        amount: Money,
        order_id: &str,
        user_id: &str,
    ) -> EngineResult<RedemptionReceipt> {
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "amount".to_string(),
            }
            .into());
        }

        let code = normalize_code(code)?;
        let entry = {
            let id = self
                .code_index
                .read()
                .await
                .get(&code)
                .cloned()
                .ok_or_else(|| EngineError::not_found("gift card", &code))?;
            self.entry(&id).await?
        };

        let mut card = entry.write().await;

        let now = Utc::now();
        if let Some(reason) = check_spendable(&card, None, now) {
            return Err(rejection_to_error(&card, reason));
        }

        let previous_balance = card.balance;
        let redeemed = amount.min_of(card.balance);
        card.balance -= redeemed;
        card.last_used_at = Some(now);
        if card.balance.is_zero() {
            card.status = GiftCardStatus::Used;
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            kind: TransactionKind::Redemption,
            gift_card_id: card.id.clone(),
            gift_card_code: card.code.clone(),
            amount: redeemed,
            previous_balance,
            new_balance: card.balance,
            order_id: Some(order_id.to_string()),
            user_id: Some(user_id.to_string()),
            actor: None,
            reason: None,
            timestamp: now,
        };
        card.usage_history.push(transaction.clone());

        let receipt = RedemptionReceipt {
            redeemed_amount: redeemed,
            remaining_balance: card.balance,
            transaction_id: transaction.id.clone(),
        };

        debug!(
            code = %card.code,
            order_id = %order_id,
            redeemed = %redeemed,
            remaining = %card.balance,
            "Gift card redeemed"
        );

        // Still inside the card's critical section: the audit mirror and
        // the debit commit together.
        self.transactions.write().await.push(transaction);
        drop(card);

        Ok(receipt)
    }

    /// Credits a card back after an order cancellation or refund.
    ///
    /// The credit is clamped so the balance never exceeds the face value,
    /// and a `used` card with restored balance returns to `active`.
    pub async fn refund(
        &self,
        id: &str,
        amount: Money,
        order_id: &str,
    ) -> EngineResult<Transaction> {
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "amount".to_string(),
            }
            .into());
        }

        let entry = self.entry(id).await?;
        let mut card = entry.write().await;

        if card.status == GiftCardStatus::Cancelled {
            return Err(EngineError::state(
                "gift card",
                id,
                card.status.to_string(),
                "refund",
            ));
        }

        let previous_balance = card.balance;
        let headroom = card.original_amount - card.balance;
        let credited = amount.min_of(headroom);
        card.balance += credited;
        if card.status == GiftCardStatus::Used && card.balance.is_positive() {
            card.status = GiftCardStatus::Active;
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            kind: TransactionKind::Refund,
            gift_card_id: card.id.clone(),
            gift_card_code: card.code.clone(),
            amount: credited,
            previous_balance,
            new_balance: card.balance,
            order_id: Some(order_id.to_string()),
            user_id: None,
            actor: None,
            reason: None,
            timestamp: Utc::now(),
        };
        card.usage_history.push(transaction.clone());

        info!(
            id = %id,
            order_id = %order_id,
            credited = %credited,
            balance = %card.balance,
            "Gift card refunded"
        );

        self.transactions.write().await.push(transaction.clone());
        drop(card);

        Ok(transaction)
    }

    // =========================================================================
    // Support Tooling
    // =========================================================================

    /// Cancels a card. Terminal: a cancelled card never re-enters any other
    /// state. Fails once the card has been fully used.
    pub async fn cancel(&self, id: &str, reason: &str, admin_id: &str) -> EngineResult<GiftCard> {
        let entry = self.entry(id).await?;
        let mut card = entry.write().await;

        if matches!(card.status, GiftCardStatus::Used | GiftCardStatus::Cancelled) {
            return Err(EngineError::state(
                "gift card",
                id,
                card.status.to_string(),
                "cancel",
            ));
        }

        let previous_status = card.status;
        card.status = GiftCardStatus::Cancelled;
        card.cancellation = Some(CancellationReceipt {
            reason: reason.to_string(),
            cancelled_by: admin_id.to_string(),
            cancelled_at: Utc::now(),
            previous_status,
            refundable: card.balance,
        });

        info!(id = %id, code = %card.code, refundable = %card.balance, "Gift card cancelled");
        Ok(card.clone())
    }

    /// Admin balance override.
    ///
    /// Rejects balances below zero or above the face value, appends an
    /// adjustment transaction, and flips `used`/`active` according to the
    /// new balance.
    pub async fn adjust_balance(
        &self,
        id: &str,
        new_balance: Money,
        reason: &str,
        admin_id: &str,
    ) -> EngineResult<GiftCard> {
        let entry = self.entry(id).await?;
        let mut card = entry.write().await;

        if card.status == GiftCardStatus::Cancelled {
            return Err(EngineError::state(
                "gift card",
                id,
                card.status.to_string(),
                "adjust balance",
            ));
        }
        if new_balance.is_negative() {
            return Err(EngineError::InsufficientFunds {
                requested: new_balance.minor(),
                available: 0,
            });
        }
        validate_adjusted_balance(new_balance, card.original_amount)?;

        let previous_balance = card.balance;
        card.balance = new_balance;
        if new_balance.is_zero() {
            card.status = GiftCardStatus::Used;
        } else if card.status == GiftCardStatus::Used {
            card.status = GiftCardStatus::Active;
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            kind: TransactionKind::Adjustment,
            gift_card_id: card.id.clone(),
            gift_card_code: card.code.clone(),
            amount: new_balance - previous_balance,
            previous_balance,
            new_balance,
            order_id: None,
            user_id: None,
            actor: Some(admin_id.to_string()),
            reason: Some(reason.to_string()),
            timestamp: Utc::now(),
        };
        card.usage_history.push(transaction.clone());

        info!(
            id = %id,
            admin = %admin_id,
            previous = %previous_balance,
            new = %new_balance,
            "Gift card balance adjusted"
        );

        self.transactions.write().await.push(transaction);
        let snapshot = card.clone();
        drop(card);

        Ok(snapshot)
    }

    /// Idempotent expiration sweep: every `active` card past its expiration
    /// date becomes `expired`. Never touches pending, used, or cancelled
    /// cards. Returns how many cards were relabeled.
    ///
    /// Safe to run concurrently with `redeem`: each relabel holds the
    /// card's write lock, and redemption checks expiry inline anyway.
    pub async fn check_expired_cards(&self, now: DateTime<Utc>) -> usize {
        let entries: Vec<Arc<RwLock<GiftCard>>> =
            self.cards.read().await.values().cloned().collect();

        let mut expired = 0;
        for entry in entries {
            let mut card = entry.write().await;
            if card.status == GiftCardStatus::Active && card.is_expired(now) {
                card.status = GiftCardStatus::Expired;
                expired += 1;
                debug!(id = %card.id, code = %card.code, "Gift card expired by sweep");
            }
        }

        if expired > 0 {
            info!(count = expired, "Expiration sweep relabeled cards");
        }
        expired
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Hands the card to the notification collaborator and stamps delivery
    /// tracking on success. The PIN is never part of the notice.
    pub async fn send(&self, id: &str) -> EngineResult<()> {
        let entry = self.entry(id).await?;

        let notice = {
            let card = entry.read().await;
            DeliveryNotice {
                gift_card_id: card.id.clone(),
                code: card.code.clone(),
                amount: card.original_amount,
                currency: card.currency.clone(),
                design: card.design.clone(),
                method: card.delivery.method,
                recipient_name: card.recipient.name.clone(),
                recipient_email: card.recipient.email.clone(),
                recipient_phone: card.recipient.phone.clone(),
                purchaser_name: card.purchaser.name.clone(),
                message: card.recipient.message.clone(),
            }
        };

        self.notifier
            .deliver(&notice)
            .await
            .map_err(|err| EngineError::DeliveryFailed(err.to_string()))?;

        let mut card = entry.write().await;
        card.delivery.sent_at = Some(Utc::now());
        card.delivery.status = DeliveryStatus::Sent;
        info!(id = %id, code = %card.code, "Gift card delivered");

        Ok(())
    }

    /// Re-sends a card, optionally to a corrected email address.
    pub async fn resend(&self, id: &str, new_email: Option<String>) -> EngineResult<()> {
        if let Some(email) = new_email {
            let entry = self.entry(id).await?;
            entry.write().await.recipient.email = Some(email);
        }
        self.send(id).await
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Snapshot of a card by id.
    pub async fn get(&self, id: &str) -> EngineResult<GiftCard> {
        let entry = self.entry(id).await?;
        let card = entry.read().await;
        Ok(card.clone())
    }

    /// Snapshot of a card by code.
    pub async fn find_by_code(&self, code: &str) -> Option<GiftCard> {
        let code = normalize_code(code).ok()?;
        let id = self.code_index.read().await.get(&code).cloned()?;
        let entry = self.cards.read().await.get(&id).cloned()?;
        let card = entry.read().await;
        Some(card.clone())
    }

    /// A card's ordered transaction history.
    pub async fn transactions_for(&self, id: &str) -> EngineResult<Vec<Transaction>> {
        let card = self.get(id).await?;
        Ok(card.usage_history)
    }

    /// Cards bought by a purchaser, newest first, with masked codes (the
    /// purchaser is not the spender).
    pub async fn for_purchaser(&self, purchaser_id: &str) -> Vec<GiftCardSummary> {
        let entries: Vec<Arc<RwLock<GiftCard>>> =
            self.cards.read().await.values().cloned().collect();

        let mut summaries = Vec::new();
        for entry in entries {
            let card = entry.read().await;
            if card.purchaser.id == purchaser_id {
                let mut summary = GiftCardSummary::from(&*card);
                summary.code = card.masked_code();
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| b.expiration_date.cmp(&a.expiration_date));
        summaries
    }

    /// Cards addressed to a recipient email, newest first, with full codes.
    pub async fn for_recipient(&self, email: &str) -> Vec<GiftCardSummary> {
        let entries: Vec<Arc<RwLock<GiftCard>>> =
            self.cards.read().await.values().cloned().collect();

        let mut summaries = Vec::new();
        for entry in entries {
            let card = entry.read().await;
            if card.recipient.email.as_deref() == Some(email) {
                summaries.push(GiftCardSummary::from(&*card));
            }
        }
        summaries.sort_by(|a, b| b.expiration_date.cmp(&a.expiration_date));
        summaries
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn entry(&self, id: &str) -> EngineResult<Arc<RwLock<GiftCard>>> {
        self.cards
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("gift card", id))
    }

    /// Generates a code not present in the index and claims it for `id`.
    ///
    /// The index write lock is held across check-and-claim so concurrent
    /// creates cannot race for the same code. The retry budget is bounded;
    /// on exhaustion the create fails rather than recursing.
    async fn claim_unique_code(&self, id: &str) -> EngineResult<String> {
        let mut code_index = self.code_index.write().await;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = random_code();
            if !code_index.contains_key(&candidate) {
                code_index.insert(candidate.clone(), id.to_string());
                return Ok(candidate);
            }
        }
        Err(EngineError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }
}

impl Default for GiftCardLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a card cannot be spent right now, or `None` if it can.
///
/// Shared by the preview path (`validate`) and the commit path (`redeem`);
/// the commit path re-runs it under the card's write lock.
fn check_spendable(
    card: &GiftCard,
    pin: Option<&str>,
    now: DateTime<Utc>,
) -> Option<GiftCardRejection> {
    if let Some(pin) = pin {
        if card.security_pin != pin {
            return Some(GiftCardRejection::PinMismatch);
        }
    }

    match card.status {
        GiftCardStatus::Cancelled => return Some(GiftCardRejection::Cancelled),
        GiftCardStatus::Pending => return Some(GiftCardRejection::NotActivated),
        GiftCardStatus::Expired => return Some(GiftCardRejection::Expired),
        GiftCardStatus::Active | GiftCardStatus::Used => {}
    }

    // Inline expiry wins over the sweep's relabel
    if card.is_expired(now) {
        return Some(GiftCardRejection::Expired);
    }

    if !card.balance.is_positive() {
        return Some(GiftCardRejection::ZeroBalance);
    }

    None
}

/// Maps a commit-path rejection into the error taxonomy.
fn rejection_to_error(card: &GiftCard, reason: GiftCardRejection) -> EngineError {
    let status = match reason {
        GiftCardRejection::UnknownCode => {
            return EngineError::not_found("gift card", &card.code)
        }
        GiftCardRejection::PinMismatch => "pin mismatch",
        GiftCardRejection::NotActivated => "not activated",
        GiftCardRejection::Cancelled => "cancelled",
        GiftCardRejection::Expired => "expired",
        GiftCardRejection::ZeroBalance => "zero balance",
    };
    EngineError::state("gift card", &card.code, status, "redeem")
}

// =============================================================================
// Unit Tests
// =============================================================================
