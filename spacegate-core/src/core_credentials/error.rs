//! Credential encryption errors

use thiserror::Error;

/// Errors raised while sealing or opening stored third-party credentials
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The stored value is not `nonce:tag:ciphertext` in hex
    #[error("Malformed credential blob: {0}")]
    Malformed(String),

    /// Authentication tag mismatch: tampered data or a different key
    #[error("Credential failed integrity check")]
    Integrity,

    #[error("Credential key too short: {len} bytes, 32 required")]
    KeyTooShort { len: usize },

    #[error("No credential key configured")]
    KeyMissing,

    #[error("Decrypted credential is not valid UTF-8")]
    NotUtf8,

    #[error("Encryption failed")]
    Encryption,
}

impl CredentialError {
    /// Whether this failure means the stored data cannot be trusted
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, CredentialError::Integrity | CredentialError::Malformed(_))
    }
}
