//! CryptNode OTP Primitives
//!
//! Pure building blocks for time-based one-time-password authentication:
//! a Base32 codec for shared secrets, RFC 4226 HOTP code derivation, and
//! RFC 6238 time-stepping with windowed, constant-time verification.
//!
//! Everything here is deterministic and side-effect free. Callers supply
//! the secret, the counter or wall-clock time; randomness for minting
//! secrets lives one level up, behind the core crate's environment seam.
//! That keeps the whole surface testable against the published RFC
//! vectors.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod base32;
pub mod otp;

pub use otp::{DIGITS, PERIOD_SECS, WINDOW, hotp, sanitize_token, totp_at, verify_at};
