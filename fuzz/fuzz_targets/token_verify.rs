//! Fuzz target for token sanitization and windowed verification.
//!
//! Candidate tokens come from users; malformed input must verify
//! negative, never panic. Secrets are arbitrary too, since the decoder
//! is tolerant and verification must cope with whatever survived
//! storage.
//!
//! Invariants:
//! - verify_at never panics for any (secret, token, time)
//! - a sanitized token that is not exactly six digits never matches
//! - a token freshly minted for the same time always matches

#![no_main]

use arbitrary::Arbitrary;
use cryptnode_crypto::otp;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct VerifyScenario {
    secret: String,
    token: String,
    epoch_millis: u64,
}

fuzz_target!(|scenario: VerifyScenario| {
    let VerifyScenario { secret, token, epoch_millis } = scenario;

    let matched = otp::verify_at(&secret, &token, epoch_millis);
    if otp::sanitize_token(&token).len() != otp::DIGITS as usize {
        assert!(matched.is_none(), "malformed token accepted");
    }

    // Self-consistency: a code minted right now verifies
    let fresh = otp::totp_at(&secret, epoch_millis);
    assert!(otp::verify_at(&secret, &fresh, epoch_millis).is_some());
});
