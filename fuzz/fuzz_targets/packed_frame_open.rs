//! Fuzz target for the AEAD engine's packed-frame open path.
//!
//! Packed frames arrive over the wire from peers; `open` must reject
//! malformed base64, truncated frames, and forged ciphertext with a
//! typed error, never a panic. Frames produced by `seal` must round-trip.

#![no_main]

use arbitrary::Arbitrary;
use cryptnode_core::{AEAD_KEY_SIZE, AeadEngine, CipherEngine};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct OpenScenario {
    key: [u8; AEAD_KEY_SIZE],
    packed: String,
    plaintext: Vec<u8>,
}

fuzz_target!(|scenario: OpenScenario| {
    let OpenScenario { key, packed, plaintext } = scenario;
    let engine = AeadEngine;
    let key = engine.import_key(&key).expect("32-byte key imports");

    // Adversarial input: typed error or clean success, never a panic
    let _ = engine.open(&key, &packed);

    // Honest frames round-trip
    let sealed = engine.seal(&key, &plaintext).expect("seal succeeds");
    assert_eq!(engine.open(&key, &sealed).expect("own frame opens"), plaintext);
});
