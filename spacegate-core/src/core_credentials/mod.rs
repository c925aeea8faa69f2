//! Encryption of third-party integration credentials at rest
//!
//! - [`CredentialCipher`]: AES-256-GCM over a 32-byte key
//! - [`SecretSealer`]: encrypted storage, or plaintext in development only

pub mod cipher;
pub mod error;
pub mod sealer;

pub use cipher::{CredentialCipher, CredentialKey, KeyPolicy};
pub use error::CredentialError;
pub use sealer::SecretSealer;
