//! Fuzz target for the Base32 codec.
//!
//! The decoder is tolerant by contract: arbitrary text (including
//! invalid UTF-8 boundaries filtered out by the harness) must decode to
//! some byte string without panicking, and encode must round-trip every
//! byte string.
//!
//! Invariants:
//! - decode never panics on any string
//! - decode(encode(bytes)) == bytes
//! - encode output only contains the RFC 4648 alphabet

#![no_main]

use cryptnode_crypto::base32;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Tolerant decode over arbitrary text
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = base32::decode(text);
    }

    // Round-trip over arbitrary bytes
    let encoded = base32::encode(data);
    assert!(
        encoded.bytes().all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)),
        "alphabet violation"
    );
    assert_eq!(base32::decode(&encoded), data, "round-trip violation");
});
