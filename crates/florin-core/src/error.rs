//! # Error Types
//!
//! Domain-specific error types for the accounting engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  florin-core errors (this file)                                         │
//! │  ├── ValidationError  - Malformed input, rejected before any state      │
//! │  └── EngineError      - Lifecycle, limit, and funds violations          │
//! │                                                                         │
//! │  Checkout-facing rejections are NOT errors:                             │
//! │  ├── PromotionRejection  (types.rs) - returned as {valid:false, reason} │
//! │  └── GiftCardRejection   (types.rs) - so the UI can render a message    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, id, amounts)
//! 3. Errors are enum variants, never String
//! 4. Shopper-visible validation failures travel as decision values, not
//!    through this module

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. They are raised
/// before any storage or counter is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad code charset, bad PIN).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate promotion code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A date window where start is not before end.
    #[error("start date must be before end date")]
    InvertedDateWindow,
}

// =============================================================================
// Engine Error
// =============================================================================

/// Engine operation errors.
///
/// These represent lifecycle violations, limit breaches, and misuse of the
/// commit path. Each variant maps to one category of the taxonomy:
/// validation, not-found, state, limit, funds.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before touching storage.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown code or id.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Wrong lifecycle state for the requested operation.
    ///
    /// ## When This Occurs
    /// - Activating a card that is not pending
    /// - Cancelling a card that is already used
    /// - Hard-deleting a promotion with usage history
    #[error("{entity} {key} is {status}, cannot {operation}")]
    State {
        entity: &'static str,
        key: String,
        status: String,
        operation: &'static str,
    },

    /// Usage or per-user cap reached on the commit path.
    #[error("{scope} limit reached for promotion {promotion_id}: {used}/{limit}")]
    LimitExceeded {
        scope: &'static str,
        promotion_id: String,
        used: u32,
        limit: u32,
    },

    /// Balance arithmetic would go negative.
    ///
    /// Only reachable through misuse of `adjust_balance`; `redeem` always
    /// clamps to the remaining balance.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    /// Code generation exhausted its bounded retry budget.
    ///
    /// The retry loop is bounded rather than recursive so adversarial
    /// exhaustion of the code space cannot grow the stack.
    #[error("gift card code space exhausted after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// The notification channel refused a delivery.
    ///
    /// Fatal to the send call only. Activation is never rolled back for
    /// this; delivery status is tracked separately for retry.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and key.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Creates a State error for an operation attempted in the wrong state.
    pub fn state(
        entity: &'static str,
        key: impl Into<String>,
        status: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        EngineError::State {
            entity,
            key: key.into(),
            status: status.into(),
            operation,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::not_found("gift card", "GC-123");
        assert_eq!(err.to_string(), "gift card not found: GC-123");

        let err = EngineError::state("gift card", "GC-123", "used", "cancel");
        assert_eq!(err.to_string(), "gift card GC-123 is used, cannot cancel");

        let err = EngineError::LimitExceeded {
            scope: "usage",
            promotion_id: "p-1".to_string(),
            used: 100,
            limit: 100,
        };
        assert_eq!(
            err.to_string(),
            "usage limit reached for promotion p-1: 100/100"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 5_000,
            max: 500_000,
        };
        assert_eq!(err.to_string(), "amount must be between 5000 and 500000");
    }

    #[test]
    fn test_validation_converts_to_engine_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let engine_err: EngineError = validation_err.into();
        assert!(matches!(engine_err, EngineError::Validation(_)));
    }
}
