//! Signed URLs for branding assets shown on the access prompt

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Signing backend unavailable: {0}")]
    Unavailable(String),
}

/// Object storage URL signer
#[async_trait]
pub trait SignedUrlProvider: Send + Sync {
    async fn sign(&self, object_path: &str, ttl: Duration) -> Result<String, SignError>;
}

/// Serves objects from a fixed public base URL without signing.
/// Suitable when branding assets live on a public CDN.
#[derive(Debug, Clone)]
pub struct PublicUrlProvider {
    base_url: String,
}

impl PublicUrlProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SignedUrlProvider for PublicUrlProvider {
    async fn sign(&self, object_path: &str, _ttl: Duration) -> Result<String, SignError> {
        let path = object_path.trim_start_matches('/');
        if path.is_empty() {
            return Err(SignError::NotFound(object_path.to_string()));
        }

        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_public_urls() {
        let provider = PublicUrlProvider::new("https://cdn.example.com/");
        let url = provider
            .sign("/logos/acme.png", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/logos/acme.png");

        assert!(provider.sign("", Duration::from_secs(60)).await.is_err());
    }
}
