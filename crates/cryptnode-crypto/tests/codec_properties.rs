//! Property-based tests for the Base32 codec and OTP derivation.
//!
//! These tests verify the fundamental invariants of the primitives:
//!
//! 1. **Round-trip**: decode(encode(b)) == b for all byte strings
//! 2. **Tolerance**: decode ignores anything outside the alphabet
//! 3. **Shape**: HOTP codes are always exactly six digits
//! 4. **Window**: a token minted inside the window always verifies

use cryptnode_crypto::{base32, otp};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_decode_inverts_encode(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let encoded = base32::encode(&bytes);
        prop_assert_eq!(base32::decode(&encoded), bytes);
    }

    #[test]
    fn prop_encode_stable_over_decode(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        // Canonical strings survive a decode/encode cycle unchanged
        let canonical = base32::encode(&bytes);
        prop_assert_eq!(base32::encode(&base32::decode(&canonical)), canonical);
    }

    #[test]
    fn prop_decode_ignores_foreign_characters(
        bytes in prop::collection::vec(any::<u8>(), 1..32),
        noise in "[ \\-_.!09]{0,8}",
    ) {
        let mut noisy = base32::encode(&bytes);
        noisy.insert_str(noisy.len() / 2, &noise);
        prop_assert_eq!(base32::decode(&noisy), bytes);
    }

    #[test]
    fn prop_decode_is_case_insensitive(bytes in prop::collection::vec(any::<u8>(), 0..32)) {
        let encoded = base32::encode(&bytes);
        prop_assert_eq!(base32::decode(&encoded.to_ascii_lowercase()), bytes);
    }

    #[test]
    fn prop_hotp_is_six_ascii_digits(
        secret in prop::collection::vec(any::<u8>(), 10..30),
        counter in any::<u64>(),
    ) {
        let code = otp::hotp(&base32::encode(&secret), counter);
        prop_assert_eq!(code.len(), otp::DIGITS as usize);
        prop_assert!(code.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn prop_fresh_token_always_verifies(
        secret in prop::collection::vec(any::<u8>(), 10..30),
        // Keep away from the epoch so the -1 step exists
        epoch_millis in 60_000u64..4_000_000_000_000,
    ) {
        let secret = base32::encode(&secret);
        let token = otp::totp_at(&secret, epoch_millis);
        // A colliding adjacent step may match first, so only membership in
        // the window is asserted here; exact-counter reporting is unit-tested.
        let counter = epoch_millis / 1000 / otp::PERIOD_SECS;
        let matched = otp::verify_at(&secret, &token, epoch_millis);
        prop_assert!(matches!(matched, Some(c) if c.abs_diff(counter) <= 1));
    }
}
