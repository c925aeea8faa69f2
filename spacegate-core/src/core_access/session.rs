//! Visitor sessions
//!
//! The access core only needs three things from a session layer: mint a
//! credential for an admitted identity, resolve a credential back to the
//! identity, and revoke one. Cookie transport lives outside this crate.

use super::evaluator::VisitorIdentity;
use crate::core_space::{Clock, SpaceId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Opaque session credential handed to the visitor
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(value: impl Into<String>) -> Self {
        SessionCredential(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Mint a credential that identifies `identity` within `space_id`
    async fn create(
        &self,
        space_id: &SpaceId,
        identity: &VisitorIdentity,
    ) -> Result<SessionCredential, SessionError>;

    /// Resolve a credential presented to `space_id`
    async fn verify(
        &self,
        space_id: &SpaceId,
        credential: &SessionCredential,
    ) -> Result<Option<VisitorIdentity>, SessionError>;

    async fn revoke(&self, space_id: &SpaceId, credential: &SessionCredential) -> Result<(), SessionError>;
}

#[derive(Debug, Clone)]
struct SessionEntry {
    space_id: SpaceId,
    identity: VisitorIdentity,
    expires_at: Timestamp,
}

/// Process-local session manager
pub struct InMemorySessionManager {
    sessions: RwLock<HashMap<SessionCredential, SessionEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl InMemorySessionManager {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    pub async fn active_sessions(&self) -> usize {
        let now = self.clock.now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

#[async_trait]
impl SessionManager for InMemorySessionManager {
    async fn create(
        &self,
        space_id: &SpaceId,
        identity: &VisitorIdentity,
    ) -> Result<SessionCredential, SessionError> {
        let now = self.clock.now();
        let credential = SessionCredential(Uuid::new_v4().to_string());
        let entry = SessionEntry {
            space_id: *space_id,
            identity: identity.clone(),
            expires_at: now.plus(self.ttl),
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| existing.expires_at > now);
        sessions.insert(credential.clone(), entry);
        debug!(space_id = %space_id, "Session created");

        Ok(credential)
    }

    async fn verify(
        &self,
        space_id: &SpaceId,
        credential: &SessionCredential,
    ) -> Result<Option<VisitorIdentity>, SessionError> {
        let now = self.clock.now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(credential) {
                None => return Ok(None),
                Some(entry) if entry.space_id != *space_id => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.identity.clone())),
                Some(_) => {}
            }
        }

        // Expired
        self.sessions.write().await.remove(credential);

        Ok(None)
    }

    async fn revoke(&self, space_id: &SpaceId, credential: &SessionCredential) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(credential)
            .is_some_and(|entry| entry.space_id == *space_id)
        {
            sessions.remove(credential);
            debug!(space_id = %space_id, "Session revoked");
        }

        Ok(())
    }
}
