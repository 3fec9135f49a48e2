//! # Validation Module
//!
//! Input validation for the accounting engine.
//!
//! ## Validation Strategy
//! Malformed input is rejected here, before any counter or balance is
//! touched. Lifecycle and limit checks live in the engine; this module only
//! validates the shape and range of caller-supplied values.

use chrono::{DateTime, Utc};

use crate::error::{ValidationError, ValidationResult};
use crate::giftcard::{DeliveryMethod, Recipient};
use crate::money::Money;
use crate::{GIFT_CARD_MAX_AMOUNT, GIFT_CARD_MIN_AMOUNT, MAX_CODE_LENGTH};

// =============================================================================
// Code Normalization
// =============================================================================

/// Normalizes a promotion or gift-card code: trim, uppercase, reject empty
/// or over-long values, and restrict to the characters codes are generated
/// from.
///
/// ## Example
/// ```rust
/// use florin_core::validation::normalize_code;
///
/// assert_eq!(normalize_code("  save20 ").unwrap(), "SAVE20");
/// assert!(normalize_code("").is_err());
/// ```
pub fn normalize_code(code: &str) -> ValidationResult<String> {
    let code = code.trim().to_uppercase();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LENGTH,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code)
}

// =============================================================================
// Promotion Validators
// =============================================================================

/// Validates a promotion's discount value (percentage or fixed amount).
pub fn validate_promotion_value(value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustBePositive {
            field: "value".to_string(),
        });
    }
    Ok(())
}

/// Validates a minimum-purchase threshold.
pub fn validate_min_purchase(minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::MustBePositive {
            field: "min_purchase".to_string(),
        });
    }
    Ok(())
}

/// Validates that a promotion window starts before it ends.
pub fn validate_date_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ValidationResult<()> {
    if start >= end {
        return Err(ValidationError::InvertedDateWindow);
    }
    Ok(())
}

/// Validates a promotion display name.
pub fn validate_promotion_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Gift Card Validators
// =============================================================================

/// Validates a gift card face value against the purchase bounds.
pub fn validate_gift_card_amount(amount: Money) -> ValidationResult<()> {
    if amount.minor() < GIFT_CARD_MIN_AMOUNT || amount.minor() > GIFT_CARD_MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: GIFT_CARD_MIN_AMOUNT,
            max: GIFT_CARD_MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Validates an admin-adjusted balance: non-negative and never above the
/// card's face value.
pub fn validate_adjusted_balance(
    new_balance: Money,
    original_amount: Money,
) -> ValidationResult<()> {
    if new_balance.is_negative() || new_balance > original_amount {
        return Err(ValidationError::OutOfRange {
            field: "balance".to_string(),
            min: 0,
            max: original_amount.minor(),
        });
    }
    Ok(())
}

/// Validates a 4-digit security PIN.
pub fn validate_pin_format(pin: &str) -> ValidationResult<()> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "pin".to_string(),
            reason: "must be exactly 4 digits".to_string(),
        });
    }
    Ok(())
}

/// Validates that the recipient carries a contact usable by the chosen
/// delivery method.
pub fn validate_recipient_contact(
    recipient: &Recipient,
    method: DeliveryMethod,
) -> ValidationResult<()> {
    let missing = match method {
        DeliveryMethod::Email => recipient.email.as_deref().unwrap_or("").trim().is_empty(),
        DeliveryMethod::Sms => recipient.phone.as_deref().unwrap_or("").trim().is_empty(),
        // Print is handed to the purchaser; no recipient contact needed
        DeliveryMethod::Print => false,
    };

    if missing {
        let field = match method {
            DeliveryMethod::Email => "recipient email",
            DeliveryMethod::Sms => "recipient phone",
            DeliveryMethod::Print => unreachable!(),
        };
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(email: Option<&str>, phone: Option<&str>) -> Recipient {
        Recipient {
            name: "Berta".to_string(),
            email: email.map(String::from),
            phone: phone.map(String::from),
            message: None,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save20 ").unwrap(), "SAVE20");
        assert_eq!(normalize_code("flat-500").unwrap(), "FLAT-500");

        assert!(normalize_code("").is_err());
        assert!(normalize_code("   ").is_err());
        assert!(normalize_code("has space").is_err());
        assert!(normalize_code(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_promotion_value() {
        assert!(validate_promotion_value(0).is_ok());
        assert!(validate_promotion_value(20).is_ok());
        assert!(validate_promotion_value(-1).is_err());
    }

    #[test]
    fn test_validate_date_window() {
        let now = Utc::now();
        assert!(validate_date_window(now, now + chrono::Duration::days(1)).is_ok());
        assert!(validate_date_window(now, now).is_err());
        assert!(validate_date_window(now + chrono::Duration::days(1), now).is_err());
    }

    #[test]
    fn test_validate_gift_card_amount_bounds() {
        assert!(validate_gift_card_amount(Money::from_minor(5_000)).is_ok());
        assert!(validate_gift_card_amount(Money::from_minor(500_000)).is_ok());
        assert!(validate_gift_card_amount(Money::from_minor(4_999)).is_err());
        assert!(validate_gift_card_amount(Money::from_minor(500_001)).is_err());
    }

    #[test]
    fn test_validate_adjusted_balance() {
        let original = Money::from_minor(50_000);
        assert!(validate_adjusted_balance(Money::zero(), original).is_ok());
        assert!(validate_adjusted_balance(Money::from_minor(50_000), original).is_ok());
        assert!(validate_adjusted_balance(Money::from_minor(-1), original).is_err());
        assert!(validate_adjusted_balance(Money::from_minor(50_001), original).is_err());
    }

    #[test]
    fn test_validate_pin_format() {
        assert!(validate_pin_format("1234").is_ok());
        assert!(validate_pin_format("0000").is_ok());
        assert!(validate_pin_format("123").is_err());
        assert!(validate_pin_format("12345").is_err());
        assert!(validate_pin_format("12a4").is_err());
    }

    #[test]
    fn test_validate_recipient_contact() {
        assert!(validate_recipient_contact(
            &recipient(Some("b@example.com"), None),
            DeliveryMethod::Email
        )
        .is_ok());
        assert!(
            validate_recipient_contact(&recipient(None, None), DeliveryMethod::Email).is_err()
        );
        assert!(validate_recipient_contact(
            &recipient(None, Some("+56911112222")),
            DeliveryMethod::Sms
        )
        .is_ok());
        assert!(
            validate_recipient_contact(&recipient(None, None), DeliveryMethod::Sms).is_err()
        );
        // Print never requires a recipient contact
        assert!(
            validate_recipient_contact(&recipient(None, None), DeliveryMethod::Print).is_ok()
        );
    }
}
