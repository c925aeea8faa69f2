//! In-process stand-ins for the collaborators the access core calls out to

use crate::core_access::{
    InMemorySessionManager, SessionCredential, SessionError, SessionManager, SignError,
    SignedUrlProvider, VisitorIdentity,
};
use crate::core_notify::{MailError, MailTemplate, Mailer};
use crate::core_space::{Clock, EmailAddress, SpaceId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// An email captured by [`MemoryMailer`]
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: EmailAddress,
    pub template: MailTemplate,
    pub payload: serde_json::Value,
}

/// Records every email instead of sending it. Can be switched to fail.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sends attempted, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, to: &EmailAddress) -> Vec<SentMail> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|mail| &mail.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(
        &self,
        to: &EmailAddress,
        template: MailTemplate,
        payload: serde_json::Value,
    ) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Unavailable("test mailer switched off".to_string()));
        }

        self.sent.lock().await.push(SentMail {
            to: to.clone(),
            template,
            payload,
        });
        Ok(())
    }
}

/// Session manager that counts revocations and can refuse to create sessions
pub struct RecordingSessionManager {
    inner: InMemorySessionManager,
    created: AtomicUsize,
    revoked: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingSessionManager {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner: InMemorySessionManager::new(clock, ttl),
            created: AtomicUsize::new(0),
            revoked: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }

    pub async fn active_sessions(&self) -> usize {
        self.inner.active_sessions().await
    }
}

#[async_trait]
impl SessionManager for RecordingSessionManager {
    async fn create(
        &self,
        space_id: &SpaceId,
        identity: &VisitorIdentity,
    ) -> Result<SessionCredential, SessionError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionError::Unavailable("test sessions switched off".to_string()));
        }

        let credential = self.inner.create(space_id, identity).await?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(credential)
    }

    async fn verify(
        &self,
        space_id: &SpaceId,
        credential: &SessionCredential,
    ) -> Result<Option<VisitorIdentity>, SessionError> {
        self.inner.verify(space_id, credential).await
    }

    async fn revoke(&self, space_id: &SpaceId, credential: &SessionCredential) -> Result<(), SessionError> {
        self.revoked.fetch_add(1, Ordering::SeqCst);
        self.inner.revoke(space_id, credential).await
    }
}

/// Signs every path under a fixed prefix, with the ttl in the query
#[derive(Debug, Clone)]
pub struct StaticUrlSigner {
    prefix: String,
}

impl StaticUrlSigner {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for StaticUrlSigner {
    fn default() -> Self {
        Self::new("https://assets.test")
    }
}

#[async_trait]
impl SignedUrlProvider for StaticUrlSigner {
    async fn sign(&self, object_path: &str, ttl: Duration) -> Result<String, SignError> {
        Ok(format!(
            "{}/{}?expires_in={}",
            self.prefix,
            object_path.trim_start_matches('/'),
            ttl.as_secs()
        ))
    }
}

/// A signing backend that is always down
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingUrlSigner;

#[async_trait]
impl SignedUrlProvider for FailingUrlSigner {
    async fn sign(&self, _object_path: &str, _ttl: Duration) -> Result<String, SignError> {
        Err(SignError::Unavailable("test signer switched off".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ManualClock;

    #[tokio::test]
    async fn test_memory_mailer_records_and_fails() {
        let mailer = MemoryMailer::new();
        let to = EmailAddress::parse("a@x.com").unwrap();

        mailer
            .send(&to, MailTemplate::Mention, serde_json::json!({"k": 1}))
            .await
            .unwrap();
        mailer.set_failing(true);
        assert!(mailer
            .send(&to, MailTemplate::Mention, serde_json::json!({}))
            .await
            .is_err());

        assert_eq!(mailer.attempts(), 2);
        assert_eq!(mailer.sent_to(&to).await.len(), 1);
    }

    #[tokio::test]
    async fn test_recording_sessions_count() {
        let sessions = RecordingSessionManager::new(Arc::new(ManualClock::default()), Duration::from_secs(60));
        let space = SpaceId::generate();

        let credential = sessions.create(&space, &VisitorIdentity::Anonymous).await.unwrap();
        sessions.revoke(&space, &credential).await.unwrap();
        assert_eq!((sessions.created(), sessions.revoked()), (1, 1));

        sessions.set_failing(true);
        assert!(sessions.create(&space, &VisitorIdentity::Anonymous).await.is_err());
        assert_eq!(sessions.created(), 1);
    }
}
