//! HOTP/TOTP code derivation and windowed verification.
//!
//! RFC 4226 dynamic truncation over HMAC-SHA1, RFC 6238 time-stepping
//! with a 30-second period, and a ±1-step acceptance window. Candidate
//! comparison is constant-time; the HMAC computation itself is not a
//! timing-sensitive branch target.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::base32;

type HmacSha1 = Hmac<Sha1>;

/// Number of digits in a generated code.
pub const DIGITS: u32 = 6;

/// TOTP time step in seconds.
pub const PERIOD_SECS: u64 = 30;

/// Accepted counter offsets either side of the current step.
pub const WINDOW: i64 = 1;

/// Derive the HOTP code for a counter value.
///
/// The secret is Base32-decoded to raw key bytes. The code is the
/// dynamically truncated HMAC-SHA1 of the 8-byte big-endian counter:
/// the low 4 bits of the last digest byte select a 4-byte window, whose
/// top bit is masked to avoid sign ambiguity, reduced modulo `10^DIGITS`
/// and left-padded with zeros.
pub fn hotp(secret_base32: &str, counter: u64) -> String {
    let key = base32::decode(secret_base32);
    let Ok(mut mac) = HmacSha1::new_from_slice(&key) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let code = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);
    let code = code % 10u32.pow(DIGITS);

    format!("{code:0width$}", width = DIGITS as usize)
}

/// Derive the TOTP code for a wall-clock time.
///
/// Counter = `epoch_millis / 1000 / PERIOD_SECS`, then [`hotp`].
pub fn totp_at(secret_base32: &str, epoch_millis: u64) -> String {
    hotp(secret_base32, epoch_millis / 1000 / PERIOD_SECS)
}

/// Strip everything except ASCII digits from a candidate token.
///
/// Users paste codes with the grouping their authenticator displays
/// ("287 082"); only the digits matter.
pub fn sanitize_token(token: &str) -> String {
    token.chars().filter(char::is_ascii_digit).collect()
}

/// Verify a candidate token against a secret at the given time.
///
/// Returns the absolute counter that matched, or `None`. The sanitized
/// token must be exactly [`DIGITS`] digits; expected codes are computed
/// for counter offsets `-WINDOW..=WINDOW` (±30 seconds) and compared in
/// constant time. Any single match accepts.
pub fn verify_at(secret_base32: &str, token: &str, epoch_millis: u64) -> Option<u64> {
    let cleaned = sanitize_token(token);
    if cleaned.len() != DIGITS as usize {
        return None;
    }

    let current = (epoch_millis / 1000 / PERIOD_SECS) as i64;
    for offset in -WINDOW..=WINDOW {
        let Ok(counter) = u64::try_from(current + offset) else {
            continue;
        };
        let expected = hotp(secret_base32, counter);
        if constant_time_eq(expected.as_bytes(), cleaned.as_bytes()) {
            return Some(counter);
        }
    }

    None
}
