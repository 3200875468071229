//! Enrollment-to-verification flow for the MFA service.
//!
//! Drives the full user story against in-memory storage and a mock
//! clock: onboard, confirm, verify, replay, and the rate-limiter gate
//! that the login screen puts in front of verification attempts.

use async_trait::async_trait;
use cryptnode_core::{
    Environment, MemoryStorage, MfaConfig, MfaError, MfaService, RateLimiter, SecureStorage,
    StorageError, env::test_utils::MockEnv,
};
use cryptnode_crypto::otp;

const EMAIL: &str = "bob@example.com";

fn service(env: MockEnv) -> MfaService<MemoryStorage, MockEnv> {
    MfaService::new(MemoryStorage::new(), env, MfaConfig::default())
}

#[tokio::test]
async fn enrollment_then_verification() {
    let env = MockEnv::at(1_700_000_015_000);
    let mfa = service(env.clone());

    // Enrollment: secret minted, URI built, nothing provisioned yet
    let onboarding = mfa.get_onboarding(EMAIL).await.unwrap();
    assert!(onboarding.otp_auth_uri.starts_with("otpauth://totp/CryptNode%3A"));
    assert!(onboarding.otp_auth_uri.contains(&format!("secret={}", onboarding.secret)));
    assert!(mfa.is_enabled(EMAIL).await.unwrap());
    assert!(!mfa.is_provisioned(EMAIL).await.unwrap());

    // User scans the QR and confirms with a code from their app
    let token = otp::totp_at(&onboarding.secret, env.now_unix_millis());
    assert!(mfa.verify_user_token(EMAIL, &token).await.unwrap());
    mfa.set_provisioned(EMAIL, true).await.unwrap();
    assert!(mfa.is_provisioned(EMAIL).await.unwrap());

    // The enrollment payload is stable across calls
    let again = mfa.get_onboarding(EMAIL).await.unwrap();
    assert_eq!(again.secret, onboarding.secret);
}

#[tokio::test]
async fn accepted_code_cannot_be_replayed() {
    let env = MockEnv::at(1_700_000_015_000);
    let mfa = service(env.clone());
    let secret = mfa.get_or_create_secret(EMAIL).await.unwrap();

    let token = otp::totp_at(&secret, env.now_unix_millis());
    assert!(mfa.verify_user_token(EMAIL, &token).await.unwrap());

    // Same code, still inside its window: rejected
    env.advance(10_000);
    assert!(!mfa.verify_user_token(EMAIL, &token).await.unwrap());
}

#[tokio::test]
async fn rate_limiter_gates_repeated_attempts() {
    let env = MockEnv::at(1_700_000_015_000);
    let mfa = service(env.clone());
    let secret = mfa.get_or_create_secret(EMAIL).await.unwrap();
    let mut limiter = RateLimiter::new(3, 1_000, env.clone());

    // A guess that is provably outside the acceptance window
    let now = env.now_unix_millis();
    let valid: Vec<String> =
        [now - 30_000, now, now + 30_000].iter().map(|t| otp::totp_at(&secret, *t)).collect();
    let wrong = ["000000", "000001", "000002", "000003"]
        .iter()
        .find(|code| !valid.iter().any(|v| v == *code))
        .unwrap()
        .to_string();

    // Three wrong guesses consume the window
    for _ in 0..3 {
        assert!(limiter.is_allowed());
        assert!(!mfa.verify_user_token(EMAIL, &wrong).await.unwrap());
    }

    // The fourth attempt is blocked before the code is even checked
    let token = otp::totp_at(&secret, env.now_unix_millis());
    assert!(!limiter.is_allowed());

    // Once the window passes, the correct code goes through
    env.advance(1_001);
    assert!(limiter.is_allowed());
    assert!(mfa.verify_user_token(EMAIL, &token).await.unwrap());
}

/// Storage backend that is permanently down.
#[derive(Clone)]
struct DownStorage;

#[async_trait]
impl SecureStorage for DownStorage {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable { reason: "vault locked".to_string() })
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable { reason: "vault locked".to_string() })
    }
}

#[tokio::test]
async fn storage_failures_propagate_unchanged() {
    let mfa = MfaService::new(DownStorage, MockEnv::at(0), MfaConfig::default());

    let err = mfa.get_or_create_secret(EMAIL).await.unwrap_err();
    assert!(matches!(
        err,
        MfaError::Storage(StorageError::Unavailable { reason }) if reason == "vault locked"
    ));

    let err = mfa.verify_user_token(EMAIL, "123456").await.unwrap_err();
    assert!(matches!(err, MfaError::Storage(_)));
}
