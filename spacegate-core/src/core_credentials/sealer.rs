//! Storage-mode selection for third-party credentials

use super::cipher::{CredentialCipher, CredentialKey, KeyPolicy};
use super::error::CredentialError;
use crate::config::SecurityConfig;
use secrecy::ExposeSecret;
use tracing::warn;

/// Seals credentials before they are persisted.
///
/// `Plaintext` exists for local development without a key and can only be
/// selected through the development profile with an explicit opt-in.
#[derive(Debug, Clone)]
pub enum SecretSealer {
    Encrypted(CredentialCipher),
    Plaintext,
}

impl SecretSealer {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, CredentialError> {
        let development = config.profile.is_development();

        match &config.credential_key {
            Some(secret) => {
                let policy = if development {
                    KeyPolicy::Lenient
                } else {
                    KeyPolicy::Strict
                };
                let key = CredentialKey::derive(secret.expose_secret(), policy)?;
                Ok(SecretSealer::Encrypted(CredentialCipher::new(&key)))
            }
            None if development && config.allow_plaintext_credentials => {
                warn!("No credential key configured, integration credentials will be stored unencrypted");
                Ok(SecretSealer::Plaintext)
            }
            None => Err(CredentialError::KeyMissing),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretSealer::Encrypted(_))
    }

    /// Produce the stored form of `secret`
    pub fn seal(&self, secret: &str) -> Result<String, CredentialError> {
        match self {
            SecretSealer::Encrypted(cipher) => cipher.encrypt(secret),
            SecretSealer::Plaintext => Ok(secret.to_string()),
        }
    }

    /// Recover the secret from its stored form
    pub fn unseal(&self, stored: &str) -> Result<String, CredentialError> {
        match self {
            SecretSealer::Encrypted(cipher) => cipher.decrypt(stored),
            SecretSealer::Plaintext => Ok(stored.to_string()),
        }
    }
}
