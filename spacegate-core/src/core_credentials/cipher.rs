/*
    cipher.rs - Authenticated encryption for stored integration credentials

    AES-256-GCM with a fresh random 96-bit nonce per encryption. The stored
    form is three lower-case hex segments joined by ':':

        hex(nonce, 12 bytes) : hex(tag, 16 bytes) : hex(ciphertext)

    Security properties:
    - Tampering with any segment fails decryption with an integrity error
    - Two encryptions of the same plaintext never produce the same blob
    - Key material is zeroized on drop
*/

use super::error::CredentialError;
use crate::metrics;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use std::fmt;
use tracing::{error, warn};
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// How to treat a configured secret that is not exactly 32 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Reject secrets shorter than 32 bytes
    Strict,
    /// Zero-pad short secrets. Development only.
    Lenient,
}

/// 256-bit credential encryption key
pub struct CredentialKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl CredentialKey {
    /// Derive the key from the configured secret string.
    ///
    /// Secrets longer than 32 bytes are truncated under either policy.
    pub fn derive(secret: &str, policy: KeyPolicy) -> Result<Self, CredentialError> {
        let raw = secret.as_bytes();

        if raw.is_empty() {
            return Err(CredentialError::KeyMissing);
        }

        if raw.len() < KEY_LEN {
            match policy {
                KeyPolicy::Strict => return Err(CredentialError::KeyTooShort { len: raw.len() }),
                KeyPolicy::Lenient => {
                    warn!(len = raw.len(), "Credential key shorter than 32 bytes, zero-padding");
                }
            }
        } else if raw.len() > KEY_LEN {
            warn!(len = raw.len(), "Credential key longer than 32 bytes, truncating");
        }

        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        let n = raw.len().min(KEY_LEN);
        bytes[..n].copy_from_slice(&raw[..n]);

        Ok(CredentialKey { bytes })
    }

    /// Use 32 raw bytes as the key
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        CredentialKey {
            bytes: Zeroizing::new(bytes),
        }
    }
}

impl fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialKey([REDACTED])")
    }
}

/// Encrypts and decrypts credentials
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    pub fn new(key: &CredentialKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key.bytes[..]);
        CredentialCipher {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a credential into `nonce:tag:ciphertext`
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        self.encrypt_bytes(plaintext.as_bytes())
    }

    /// Decrypt a blob produced by [`CredentialCipher::encrypt`]
    pub fn decrypt(&self, blob: &str) -> Result<String, CredentialError> {
        String::from_utf8(self.decrypt_bytes(blob)?).map_err(|_| CredentialError::NotUtf8)
    }

    /// Encrypt arbitrary bytes into `nonce:tag:ciphertext`
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<String, CredentialError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut buffer = plaintext.to_vec();

        let tag = self
            .cipher
            .encrypt_in_place_detached(&nonce, b"", &mut buffer)
            .map_err(|_| CredentialError::Encryption)?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(&buffer)
        ))
    }

    /// Recover the exact bytes sealed by [`CredentialCipher::encrypt_bytes`]
    pub fn decrypt_bytes(&self, blob: &str) -> Result<Vec<u8>, CredentialError> {
        let segments: Vec<&str> = blob.trim().split(':').collect();
        if segments.len() != 3 {
            return Err(CredentialError::Malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let nonce = decode_segment("nonce", segments[0])?;
        let tag = decode_segment("tag", segments[1])?;
        let mut buffer = decode_segment("ciphertext", segments[2])?;

        if nonce.len() != NONCE_LEN {
            return Err(CredentialError::Malformed(format!(
                "nonce is {} bytes, expected {}",
                nonce.len(),
                NONCE_LEN
            )));
        }
        if tag.len() != TAG_LEN {
            return Err(CredentialError::Malformed(format!(
                "tag is {} bytes, expected {}",
                tag.len(),
                TAG_LEN
            )));
        }

        if self
            .cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .is_err()
        {
            metrics::credential_integrity_failure();
            error!("Stored credential failed integrity check");
            return Err(CredentialError::Integrity);
        }

        Ok(buffer)
    }
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialCipher")
    }
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, CredentialError> {
    hex::decode(segment).map_err(|e| CredentialError::Malformed(format!("{} is not hex: {}", name, e)))
}
