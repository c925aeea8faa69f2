//! Test fixtures for wiring the portal together
//!
//! [`PortalHarness`] assembles an in-memory store, a manual clock and the
//! recording doubles around a real [`AccessService`]. [`TestSpaceBuilder`]
//! creates spaces in a given shape through the vendor-side admin API.

use super::clock::ManualClock;
use super::doubles::{MemoryMailer, RecordingSessionManager, StaticUrlSigner};
use crate::config::Config;
use crate::core_access::{AccessService, SignedUrlProvider};
use crate::core_credentials::{CredentialCipher, CredentialKey, SecretSealer};
use crate::core_integrations::IntegrationVault;
use crate::core_notify::{NotificationDispatcher, NotificationRateLimiter};
use crate::core_space::{
    AccessMode, Branding, MemberRole, SpaceAccessConfig, SpaceAdmin, SpaceStatus,
};
use crate::core_store::SqlPortalStore;
use std::sync::Arc;

/// Fixed 32-byte key for credential tests
pub const TEST_CREDENTIAL_KEY: [u8; 32] = *b"spacegate-test-credential-key-32";

/// A fully wired portal backed by an in-memory database
pub struct PortalHarness {
    pub config: Config,
    pub store: Arc<SqlPortalStore>,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<MemoryMailer>,
    pub sessions: Arc<RecordingSessionManager>,
    pub admin: SpaceAdmin,
    pub service: AccessService,
}

impl PortalHarness {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_signer(Arc::new(StaticUrlSigner::default()))
    }

    pub fn with_signer(signer: Arc<dyn SignedUrlProvider>) -> anyhow::Result<Self> {
        let config = Config::default();
        let store = Arc::new(SqlPortalStore::memory()?);
        let clock = Arc::new(ManualClock::default());
        let mailer = Arc::new(MemoryMailer::new());
        let sessions = Arc::new(RecordingSessionManager::new(
            clock.clone(),
            config.access.session_ttl,
        ));

        let admin = SpaceAdmin::new(store.clone(), clock.clone());
        let service = AccessService::new(
            store.clone(),
            sessions.clone(),
            mailer.clone(),
            signer,
            clock.clone(),
            config.access.clone(),
        );

        Ok(Self {
            config,
            store,
            clock,
            mailer,
            sessions,
            admin,
            service,
        })
    }

    pub fn space(&self) -> TestSpaceBuilder<'_> {
        TestSpaceBuilder::new(&self.admin)
    }

    /// Notification dispatcher sharing this harness's store, clock and mailer
    pub fn dispatcher(&self) -> NotificationDispatcher {
        let limiter = NotificationRateLimiter::new(
            self.store.clone(),
            self.clock.clone(),
            self.config.notifications.email_window,
        );
        NotificationDispatcher::new(self.store.clone(), limiter, self.mailer.clone(), self.clock.clone())
    }

    /// Integration vault sealing with [`TEST_CREDENTIAL_KEY`]
    pub fn vault(&self) -> IntegrationVault {
        self.vault_with(test_sealer())
    }

    pub fn vault_with(&self, sealer: SecretSealer) -> IntegrationVault {
        IntegrationVault::new(self.store.clone(), sealer, self.clock.clone())
    }
}

pub fn test_cipher() -> CredentialCipher {
    CredentialCipher::new(&CredentialKey::from_bytes(TEST_CREDENTIAL_KEY))
}

pub fn test_sealer() -> SecretSealer {
    SecretSealer::Encrypted(test_cipher())
}

/// Builder for spaces in a given access shape. Defaults to an active
/// public space with no gates.
pub struct TestSpaceBuilder<'a> {
    admin: &'a SpaceAdmin,
    name: String,
    access_mode: AccessMode,
    password: Option<String>,
    require_email: bool,
    status: SpaceStatus,
    branding: Branding,
    members: Vec<(String, MemberRole)>,
}

impl<'a> TestSpaceBuilder<'a> {
    pub fn new(admin: &'a SpaceAdmin) -> Self {
        Self {
            admin,
            name: "Test Space".to_string(),
            access_mode: AccessMode::Public,
            password: None,
            require_email: false,
            status: SpaceStatus::Active,
            branding: Branding::default(),
            members: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn restricted(mut self) -> Self {
        self.access_mode = AccessMode::Restricted;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn requiring_email(mut self) -> Self {
        self.require_email = true;
        self
    }

    pub fn with_status(mut self, status: SpaceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_logo(mut self, path: impl Into<String>) -> Self {
        self.branding.logo_path = Some(path.into());
        self
    }

    pub fn with_stakeholder(self, email: impl Into<String>) -> Self {
        self.with_member(email, MemberRole::Stakeholder)
    }

    pub fn with_member(mut self, email: impl Into<String>, role: MemberRole) -> Self {
        self.members.push((email.into(), role));
        self
    }

    pub fn build(self) -> anyhow::Result<SpaceAccessConfig> {
        let space = self.admin.create_space(&self.name)?;
        let id = space.id;

        self.admin.set_access_mode(&id, self.access_mode)?;
        self.admin.set_password(&id, self.password.as_deref())?;
        self.admin.set_require_email(&id, self.require_email)?;
        self.admin.set_branding(&id, self.branding)?;

        for (email, role) in &self.members {
            self.admin.add_member(&id, email, *role)?;
        }

        for step in status_path(self.status) {
            self.admin.transition_status(&id, *step)?;
        }

        Ok(self.admin.get_space(&id)?)
    }
}

/// Transitions that take a fresh draft space to `target`
fn status_path(target: SpaceStatus) -> &'static [SpaceStatus] {
    match target {
        SpaceStatus::Draft => &[],
        SpaceStatus::Active => &[SpaceStatus::Active],
        SpaceStatus::Completed => &[SpaceStatus::Active, SpaceStatus::Completed],
        SpaceStatus::Archived => &[SpaceStatus::Archived],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_reaches_every_status() {
        let harness = PortalHarness::new().unwrap();
        for status in SpaceStatus::ALL {
            let space = harness.space().with_status(status).build().unwrap();
            assert_eq!(space.status, status);
        }
    }

    #[test]
    fn test_builder_applies_settings() {
        let harness = PortalHarness::new().unwrap();
        let space = harness
            .space()
            .restricted()
            .with_password("pw")
            .with_stakeholder("a@x.com")
            .with_member("staff@vendor.com", MemberRole::Staff)
            .build()
            .unwrap();

        assert_eq!(space.access_mode, AccessMode::Restricted);
        assert!(space.has_password());
        assert_eq!(harness.admin.list_members(&space.id).unwrap().len(), 2);
    }
}
