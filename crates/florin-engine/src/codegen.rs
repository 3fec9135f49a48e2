//! # Code and PIN Generation
//!
//! Random gift-card codes and security PINs.
//!
//! Codes are four groups of four characters from an ambiguity-free alphabet
//! (no I, O, 0, 1), e.g. `K7FQ-2MWP-XJ4H-9TRZ`. Uniqueness is NOT guaranteed
//! here; the ledger checks each candidate against its code index and retries
//! within a bounded budget.

use rand::Rng;

use florin_core::{CODE_ALPHABET, CODE_GROUPS, CODE_GROUP_LEN};

/// How many collision retries [`crate::ledger::GiftCardLedger`] allows before
/// giving up with `CodeSpaceExhausted`. Bounded, never recursive.
pub const MAX_CODE_ATTEMPTS: u32 = 32;

/// Generates one random gift-card code candidate.
pub fn random_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(CODE_GROUPS * CODE_GROUP_LEN + CODE_GROUPS - 1);

    for group in 0..CODE_GROUPS {
        if group > 0 {
            code.push('-');
        }
        for _ in 0..CODE_GROUP_LEN {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            code.push(CODE_ALPHABET[idx] as char);
        }
    }

    code
}

/// Generates a 4-digit security PIN (`1000`..`9999`).
pub fn random_pin() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(1000..10_000).to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        for _ in 0..100 {
            let code = random_code();
            assert_eq!(code.len(), 19);

            let groups: Vec<&str> = code.split('-').collect();
            assert_eq!(groups.len(), 4);
            for group in groups {
                assert_eq!(group.len(), 4);
                for c in group.bytes() {
                    assert!(CODE_ALPHABET.contains(&c), "unexpected char {}", c as char);
                }
            }
        }
    }

    #[test]
    fn test_code_excludes_ambiguous_characters() {
        for _ in 0..200 {
            let code = random_code();
            for c in ['I', 'O', '0', '1'] {
                assert!(!code.contains(c));
            }
        }
    }

    #[test]
    fn test_pin_format() {
        for _ in 0..100 {
            let pin = random_pin();
            assert_eq!(pin.len(), 4);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
