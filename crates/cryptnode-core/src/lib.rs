//! CryptNode Secret Core
//!
//! Client-side secret handling for the CryptNode messenger: a
//! priority-aware dispatcher that fans per-message encrypt/decrypt work
//! out to isolated execution units, TOTP multi-factor authentication
//! over a secure storage seam, and a sliding-window rate limiter for
//! authentication attempts.
//!
//! # Components
//!
//! - [`dispatch`]: three priority pools, each an actor owning one
//!   execution unit; request-id correlation; per-session key broadcast.
//! - [`mfa`]: per-identity secret lifecycle, otpauth enrollment payload,
//!   windowed verification with replay protection.
//! - [`rate_limit`]: fixed-capacity sliding window over attempt
//!   timestamps.
//! - [`storage`]: the async key-value seam the host application's
//!   encrypted store plugs into.
//! - [`env`]: wall-clock time and secure randomness behind one trait,
//!   for deterministic tests.
//!
//! # Composition
//!
//! Everything is constructed explicitly and wired at the application's
//! composition root:
//!
//! ```no_run
//! use cryptnode_core::{
//!     AeadEngine, CryptoDispatcher, DispatcherConfig, MfaConfig, MfaService, MemoryStorage,
//!     Priority, SessionKey, SystemEnvironment,
//! };
//!
//! # async fn compose() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = CryptoDispatcher::new(DispatcherConfig::default(), AeadEngine);
//! dispatcher.init_session("session-1", SessionKey::new(vec![0u8; 32])).await?;
//! let ciphertext = dispatcher.encrypt("session-1", b"hello".to_vec(), Priority::High).await?;
//!
//! let mfa = MfaService::new(MemoryStorage::new(), SystemEnvironment, MfaConfig::default());
//! let onboarding = mfa.get_onboarding("user@example.com").await?;
//! # let _ = (ciphertext, onboarding);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod dispatch;
pub mod env;
pub mod mfa;
pub mod rate_limit;
pub mod storage;

pub use dispatch::{
    AEAD_KEY_SIZE, AeadEngine, CipherEngine, CryptoDispatcher, DispatchError, DispatcherConfig,
    EngineError, Priority, SessionKey,
};
pub use env::{Environment, RandomError, SystemEnvironment};
pub use mfa::{MfaConfig, MfaError, MfaService, OnboardingData};
pub use rate_limit::RateLimiter;
pub use storage::{MemoryStorage, SecureStorage, StorageError};
