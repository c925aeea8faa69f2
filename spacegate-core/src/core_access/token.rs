//! Single-use magic-link tokens
//!
//! A token is 32 random bytes rendered as 64 lower-case hex characters. The
//! raw value only ever travels in the emailed link; the store keeps its
//! SHA-256 digest, so a leaked database cannot be replayed as links.

use crate::core_space::{Clock, EmailAddress, SpaceId, Timestamp};
use crate::core_store::{PortalStore, StoreResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub const TOKEN_BYTES: usize = 32;
pub const TOKEN_HEX_LEN: usize = TOKEN_BYTES * 2;

/// Persisted token record. Never deleted; `used_at` is set exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: Uuid,
    pub space_id: SpaceId,
    pub email: EmailAddress,
    /// SHA-256 of the raw token, hex
    pub token_hash: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
}

impl AccessToken {
    /// Unused and not yet expired at `now`
    pub fn is_redeemable(&self, now: Timestamp) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}

/// The raw token value carried in a magic link
#[derive(Clone, PartialEq, Eq)]
pub struct RawToken(String);

impl RawToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        RawToken(hex::encode(bytes))
    }

    /// Accept only well-formed tokens; anything else cannot match a stored digest
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() == TOKEN_HEX_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(RawToken(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for this token
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawToken([REDACTED])")
    }
}

/// A freshly issued token: the raw value for the link plus the stored record
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: RawToken,
    pub record: AccessToken,
}

/// Creates magic-link tokens for stakeholder members
pub struct TokenIssuer {
    store: Arc<dyn PortalStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn PortalStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Issue a token for `email` in `space_id`.
    ///
    /// Returns `None` without writing anything when the email is not a
    /// stakeholder member. Callers must not reveal which case occurred.
    pub fn issue(&self, space_id: &SpaceId, email: &EmailAddress) -> StoreResult<Option<IssuedToken>> {
        if self.store.find_stakeholder(space_id, email)?.is_none() {
            debug!(space_id = %space_id, email = %email, "No stakeholder for magic link request");
            return Ok(None);
        }

        let now = self.clock.now();
        let token = RawToken::generate();
        let record = AccessToken {
            id: Uuid::new_v4(),
            space_id: *space_id,
            email: email.clone(),
            token_hash: token.digest(),
            created_at: now,
            expires_at: now.plus(self.ttl),
            used_at: None,
        };

        self.store.insert_token(&record)?;

        Ok(Some(IssuedToken { token, record }))
    }
}

/// Looks up and atomically redeems presented tokens
pub struct TokenValidator {
    store: Arc<dyn PortalStore>,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(store: Arc<dyn PortalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Read-only check that `raw` names an unused, unexpired token of this space
    pub fn find_redeemable(&self, space_id: &SpaceId, raw: &str) -> StoreResult<Option<AccessToken>> {
        let Some(token) = RawToken::parse(raw) else {
            return Ok(None);
        };

        self.store
            .find_redeemable_token(space_id, &token.digest(), self.clock.now())
    }

    /// Mark the token used and stamp the owner's `joined_at` in one
    /// conditional update. At most one caller ever gets `Some`.
    pub fn redeem(&self, space_id: &SpaceId, raw: &str) -> StoreResult<Option<AccessToken>> {
        let Some(token) = RawToken::parse(raw) else {
            return Ok(None);
        };

        self.store
            .redeem_token(space_id, &token.digest(), self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_space::{MemberRole, SpaceAccessConfig, SpaceMember};
    use crate::core_store::{MemberStore, SpaceStore, SqlPortalStore, TokenStore};
    use crate::test_utils::ManualClock;

    fn setup() -> (Arc<SqlPortalStore>, Arc<ManualClock>, SpaceId, EmailAddress) {
        let store = Arc::new(SqlPortalStore::memory().unwrap());
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)));

        let space = SpaceAccessConfig::new("Tokens".to_string(), clock.now());
        store.insert_space(&space).unwrap();

        let email = EmailAddress::parse("a@x.com").unwrap();
        store
            .upsert_member(&SpaceMember {
                space_id: space.id,
                email: email.clone(),
                role: MemberRole::Stakeholder,
                invited_at: clock.now(),
                joined_at: None,
            })
            .unwrap();

        (store, clock, space.id, email)
    }

    #[test]
    fn test_raw_token_format() {
        let token = RawToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_HEX_LEN);
        assert!(RawToken::parse(token.as_str()).is_some());
        assert_ne!(token, RawToken::generate());

        assert!(RawToken::parse("").is_none());
        assert!(RawToken::parse("abc").is_none());
        assert!(RawToken::parse(&"g".repeat(TOKEN_HEX_LEN)).is_none());
    }

    #[test]
    fn test_digest_is_case_insensitive_on_input() {
        let token = RawToken::generate();
        let upper = RawToken::parse(&token.as_str().to_uppercase()).unwrap();
        assert_eq!(token.digest(), upper.digest());
        assert_ne!(token.digest(), token.as_str());
    }

    #[test]
    fn test_issue_only_for_stakeholders() {
        let (store, clock, space_id, email) = setup();
        let issuer = TokenIssuer::new(store.clone(), clock.clone(), Duration::from_secs(60));

        let stranger = EmailAddress::parse("b@x.com").unwrap();
        assert!(issuer.issue(&space_id, &stranger).unwrap().is_none());
        assert!(store.list_tokens(&space_id, &stranger).unwrap().is_empty());

        let issued = issuer.issue(&space_id, &email).unwrap().unwrap();
        assert_eq!(issued.record.expires_at, clock.now().plus(Duration::from_secs(60)));
        assert_eq!(issued.record.token_hash, issued.token.digest());
    }

    #[test]
    fn test_redeem_once_then_invalid() {
        let (store, clock, space_id, email) = setup();
        let issuer = TokenIssuer::new(store.clone(), clock.clone(), Duration::from_secs(60));
        let validator = TokenValidator::new(store.clone(), clock.clone());

        let issued = issuer.issue(&space_id, &email).unwrap().unwrap();
        let raw = issued.token.as_str();

        assert!(validator.find_redeemable(&space_id, raw).unwrap().is_some());
        assert!(validator.redeem(&space_id, raw).unwrap().is_some());
        assert!(validator.redeem(&space_id, raw).unwrap().is_none());
        assert!(validator.find_redeemable(&space_id, raw).unwrap().is_none());
    }

    #[test]
    fn test_redeem_after_expiry_fails() {
        let (store, clock, space_id, email) = setup();
        let issuer = TokenIssuer::new(store.clone(), clock.clone(), Duration::from_secs(60));
        let validator = TokenValidator::new(store.clone(), clock.clone());

        let issued = issuer.issue(&space_id, &email).unwrap().unwrap();
        clock.advance(Duration::from_secs(60));

        assert!(validator.redeem(&space_id, issued.token.as_str()).unwrap().is_none());
        assert!(!issued.record.is_redeemable(clock.now()));
    }

    #[test]
    fn test_malformed_token_never_reaches_store() {
        let (store, clock, space_id, _) = setup();
        let validator = TokenValidator::new(store, clock);
        assert!(validator.redeem(&space_id, "'; DROP TABLE access_tokens; --").unwrap().is_none());
    }
}
