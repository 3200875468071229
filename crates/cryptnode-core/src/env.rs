//! Environment abstraction for deterministic testing.
//!
//! Decouples core logic from system resources (wall-clock time, secure
//! randomness). Production uses [`SystemEnvironment`]; tests use
//! [`test_utils::MockEnv`] with a settable clock and scripted entropy.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

/// Secure randomness was unavailable on this platform.
///
/// There is no fallback to a weaker source; callers propagate this as a
/// fatal error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("secure random generator unavailable: {reason}")]
pub struct RandomError {
    /// Platform-reported failure description.
    pub reason: String,
}

/// Abstract environment providing wall-clock time and secure randomness.
///
/// # Invariants
///
/// - `now_unix_millis()` is wall-clock, not monotonic: TOTP counters are
///   shared with the user's authenticator app, so both sides must agree
///   on epoch time.
/// - `try_fill_random()` draws from a cryptographically secure source or
///   fails; it never degrades to a weaker generator.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    fn now_unix_millis(&self) -> u64;

    /// Fill the buffer with cryptographically secure random bytes.
    fn try_fill_random(&self, buffer: &mut [u8]) -> Result<(), RandomError>;
}

/// Production environment backed by the OS clock and entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn now_unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }

    fn try_fill_random(&self, buffer: &mut [u8]) -> Result<(), RandomError> {
        OsRng.try_fill_bytes(buffer).map_err(|e| RandomError { reason: e.to_string() })
    }
}

/// Test doubles for the environment seam.
pub mod test_utils {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use super::{Environment, RandomError};

    /// Deterministic environment: settable clock, counter-based entropy.
    ///
    /// Clones share the clock, so a test can hold one handle while the
    /// code under test holds another. Each `try_fill_random` call
    /// produces a distinct byte sequence unless entropy is disabled.
    #[derive(Debug, Clone)]
    pub struct MockEnv {
        now_millis: Arc<AtomicU64>,
        entropy_counter: Arc<AtomicU64>,
        entropy_available: bool,
    }

    impl MockEnv {
        /// Environment frozen at the given epoch time.
        pub fn at(now_millis: u64) -> Self {
            Self {
                now_millis: Arc::new(AtomicU64::new(now_millis)),
                entropy_counter: Arc::new(AtomicU64::new(0)),
                entropy_available: true,
            }
        }

        /// Environment whose randomness source always fails.
        pub fn without_entropy(now_millis: u64) -> Self {
            Self { entropy_available: false, ..Self::at(now_millis) }
        }

        /// Move the clock to an absolute time.
        pub fn set_now(&self, millis: u64) {
            self.now_millis.store(millis, Ordering::SeqCst);
        }

        /// Advance the clock.
        pub fn advance(&self, millis: u64) {
            self.now_millis.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Environment for MockEnv {
        fn now_unix_millis(&self) -> u64 {
            self.now_millis.load(Ordering::SeqCst)
        }

        fn try_fill_random(&self, buffer: &mut [u8]) -> Result<(), RandomError> {
            if !self.entropy_available {
                return Err(RandomError { reason: "mock entropy disabled".to_string() });
            }
            let base = self.entropy_counter.fetch_add(buffer.len() as u64, Ordering::SeqCst);
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (base.wrapping_add(i as u64) & 0xff) as u8;
            }
            Ok(())
        }
    }
}
