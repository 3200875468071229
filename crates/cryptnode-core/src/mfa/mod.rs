//! Per-identity TOTP multi-factor authentication.
//!
//! A thin stateful layer over the pure OTP primitives: it mints and
//! persists one shared secret per identity through the
//! [`SecureStorage`] seam, builds the `otpauth://` enrollment payload,
//! and verifies candidate tokens inside the ±1-step window.
//!
//! Secret existence ("enabled") and user confirmation ("provisioned")
//! are two independent flags: a secret can be generated ahead of the
//! user scanning it without MFA being enforced on a half-onboarded
//! account.

mod error;

pub use error::MfaError;

use cryptnode_crypto::{base32, otp};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{env::Environment, storage::SecureStorage};

/// Storage key prefix for the per-identity shared secret.
const SECRET_PREFIX: &str = "vault_mfa_secret";

/// Storage key prefix for the enrollment-confirmed flag.
const PROVISIONED_PREFIX: &str = "vault_mfa_provisioned";

/// Storage key prefix for the replay guard's last accepted counter.
const LAST_COUNTER_PREFIX: &str = "vault_mfa_last_counter";

/// Length of a freshly generated secret in raw bytes (32 Base32 chars).
const SECRET_BYTES: usize = 20;

/// HMAC algorithm advertised in the provisioning URI.
const OTP_ALGORITHM: &str = "SHA1";

/// Characters escaped in URI components, matching what authenticator
/// apps expect in an otpauth label (everything except unreserved marks).
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Display and URI identity of the application.
#[derive(Debug, Clone)]
pub struct MfaConfig {
    /// Label prefix in the otpauth URI (`app_name:email`).
    pub app_name: String,
    /// Value of the URI's `issuer` parameter.
    pub issuer: String,
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self { app_name: "CryptNode".to_string(), issuer: "CryptNode".to_string() }
    }
}

/// Enrollment payload handed to the UI.
///
/// Contains the provisioning URI for QR rendering plus the same fields
/// broken out for manual entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingData {
    /// The Base32 shared secret.
    pub secret: String,
    /// `otpauth://totp/...` URI consumed by authenticator apps.
    pub otp_auth_uri: String,
    /// `app_name:email` account label.
    pub account_name: String,
    /// Issuer shown by the authenticator.
    pub issuer: String,
    /// HMAC algorithm name.
    pub algorithm: String,
    /// Code length in digits.
    pub digits: u32,
    /// Time step in seconds.
    pub period: u64,
}

/// Per-identity MFA orchestration over storage and environment seams.
pub struct MfaService<S, E> {
    storage: S,
    env: E,
    config: MfaConfig,
}

fn storage_key(prefix: &str, email: &str) -> String {
    format!("{prefix}:{email}")
}

impl<S: SecureStorage, E: Environment> MfaService<S, E> {
    /// Create a service over the given storage backend and environment.
    pub fn new(storage: S, env: E, config: MfaConfig) -> Self {
        Self { storage, env, config }
    }

    /// Mint a fresh shared secret: 20 secure random bytes as 32 Base32
    /// characters.
    ///
    /// Fails only if the platform has no secure randomness source; that
    /// error is fatal and never downgraded.
    pub fn generate_secret(&self) -> Result<String, MfaError> {
        let mut bytes = [0u8; SECRET_BYTES];
        self.env.try_fill_random(&mut bytes)?;
        Ok(base32::encode(&bytes))
    }

    /// Build the enrollment payload for an identity and secret.
    pub fn onboarding_data(&self, email: &str, secret: &str) -> OnboardingData {
        let account_name = format!("{}:{email}", self.config.app_name);
        let label = utf8_percent_encode(&account_name, URI_COMPONENT);
        let issuer = utf8_percent_encode(&self.config.issuer, URI_COMPONENT);
        let otp_auth_uri = format!(
            "otpauth://totp/{label}?secret={secret}&issuer={issuer}&algorithm={OTP_ALGORITHM}&digits={}&period={}",
            otp::DIGITS,
            otp::PERIOD_SECS,
        );

        OnboardingData {
            secret: secret.to_string(),
            otp_auth_uri,
            account_name,
            issuer: self.config.issuer.clone(),
            algorithm: OTP_ALGORITHM.to_string(),
            digits: otp::DIGITS,
            period: otp::PERIOD_SECS,
        }
    }

    /// Return the identity's secret, minting and persisting one if none
    /// exists. Idempotent: a second call returns the stored secret.
    pub async fn get_or_create_secret(&self, email: &str) -> Result<String, MfaError> {
        if let Some(existing) = self.read(SECRET_PREFIX, email).await? {
            return Ok(existing);
        }
        let secret = self.generate_secret()?;
        self.storage.set(&storage_key(SECRET_PREFIX, email), &secret).await?;
        Ok(secret)
    }

    /// Enrollment payload for an identity, creating the secret if needed.
    pub async fn get_onboarding(&self, email: &str) -> Result<OnboardingData, MfaError> {
        let secret = self.get_or_create_secret(email).await?;
        Ok(self.onboarding_data(email, &secret))
    }

    /// Whether a secret exists for the identity.
    pub async fn is_enabled(&self, email: &str) -> Result<bool, MfaError> {
        Ok(self.read(SECRET_PREFIX, email).await?.is_some())
    }

    /// Remove the identity's secret.
    pub async fn clear_secret(&self, email: &str) -> Result<(), MfaError> {
        self.storage.set(&storage_key(SECRET_PREFIX, email), "").await?;
        Ok(())
    }

    /// Whether the user confirmed enrollment in their authenticator.
    pub async fn is_provisioned(&self, email: &str) -> Result<bool, MfaError> {
        Ok(self.read(PROVISIONED_PREFIX, email).await?.as_deref() == Some("1"))
    }

    /// Record or revoke enrollment confirmation.
    pub async fn set_provisioned(&self, email: &str, value: bool) -> Result<(), MfaError> {
        let encoded = if value { "1" } else { "0" };
        self.storage.set(&storage_key(PROVISIONED_PREFIX, email), encoded).await?;
        Ok(())
    }

    /// Remove the enrollment flag entirely.
    pub async fn clear_provisioned(&self, email: &str) -> Result<(), MfaError> {
        self.storage.set(&storage_key(PROVISIONED_PREFIX, email), "").await?;
        Ok(())
    }

    /// Verify a candidate token against a raw secret.
    ///
    /// Window-only acceptance: any match at counter offsets -1, 0, +1.
    /// Malformed tokens verify negative, they never error.
    pub fn verify_token(&self, secret: &str, token: &str) -> bool {
        otp::verify_at(secret, token, self.env.now_unix_millis()).is_some()
    }

    /// Verify a candidate token for an identity, with replay protection.
    ///
    /// On top of the window rule, the matched counter must exceed the
    /// last accepted one for this identity; an accepted token advances
    /// the stored counter, so replaying it within the window fails.
    /// Identities without a secret always verify negative.
    pub async fn verify_user_token(&self, email: &str, token: &str) -> Result<bool, MfaError> {
        let Some(secret) = self.read(SECRET_PREFIX, email).await? else {
            return Ok(false);
        };
        let Some(counter) = otp::verify_at(&secret, token, self.env.now_unix_millis()) else {
            return Ok(false);
        };

        let last_accepted = self
            .read(LAST_COUNTER_PREFIX, email)
            .await?
            .and_then(|raw| raw.parse::<u64>().ok());
        if last_accepted.is_some_and(|last| counter <= last) {
            tracing::debug!(email, counter, "rejecting replayed or stale code");
            return Ok(false);
        }

        self.storage.set(&storage_key(LAST_COUNTER_PREFIX, email), &counter.to_string()).await?;
        Ok(true)
    }

    /// Read a namespaced value, treating the empty string as absent.
    async fn read(&self, prefix: &str, email: &str) -> Result<Option<String>, MfaError> {
        let value = self.storage.get(&storage_key(prefix, email)).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }
}
