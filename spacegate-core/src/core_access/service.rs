//! External access entry points
//!
//! [`AccessService`] ties the lifecycle gate, the policy evaluator, magic
//! links and the session manager together. Every path checks the space's
//! lifecycle status first.

use super::error::{AccessError, AccessResult};
use super::evaluator::{
    evaluate, AccessCredentials, AccessDecision, AccessPolicy, DenyReason, VisitorIdentity,
};
use super::session::{SessionCredential, SessionManager};
use super::signing::SignedUrlProvider;
use super::token::{IssuedToken, RawToken, TokenIssuer, TokenValidator};
use crate::config::AccessConfig;
use crate::core_notify::{MailTemplate, Mailer};
use crate::core_space::{AccessMode, Clock, EmailAddress, SpaceAccessConfig, SpaceId};
use crate::core_store::PortalStore;
use crate::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Admitted visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub identity: VisitorIdentity,
    pub session: SessionCredential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted(AccessGrant),
    Denied(DenyReason),
}

impl AccessOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted(_))
    }

    pub fn denial(&self) -> Option<DenyReason> {
        match self {
            AccessOutcome::Granted(_) => None,
            AccessOutcome::Denied(reason) => Some(*reason),
        }
    }
}

/// Result of a magic-link request.
///
/// `Accepted` is returned whether or not the email belongs to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRequestOutcome {
    Accepted,
    Denied(DenyReason),
}

/// What the entry page needs to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPrompt {
    pub space_name: String,
    pub brand_color: Option<String>,
    pub logo_url: Option<String>,
    pub access_mode: AccessMode,
    pub requires_email: bool,
    pub requires_password: bool,
    /// No prompt needed; entering admits anonymously
    pub auto_admit: bool,
    pub denial: Option<DenyReason>,
}

pub struct AccessService {
    store: Arc<dyn PortalStore>,
    sessions: Arc<dyn SessionManager>,
    mailer: Arc<dyn Mailer>,
    signer: Arc<dyn SignedUrlProvider>,
    clock: Arc<dyn Clock>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    config: AccessConfig,
}

impl AccessService {
    pub fn new(
        store: Arc<dyn PortalStore>,
        sessions: Arc<dyn SessionManager>,
        mailer: Arc<dyn Mailer>,
        signer: Arc<dyn SignedUrlProvider>,
        clock: Arc<dyn Clock>,
        config: AccessConfig,
    ) -> Self {
        let issuer = TokenIssuer::new(store.clone(), clock.clone(), config.magic_link_ttl);
        let validator = TokenValidator::new(store.clone(), clock.clone());

        Self {
            store,
            sessions,
            mailer,
            signer,
            clock,
            issuer,
            validator,
            config,
        }
    }

    fn load_space(&self, space_id: &SpaceId) -> AccessResult<SpaceAccessConfig> {
        self.store
            .get_space(space_id)?
            .ok_or(AccessError::SpaceNotFound(*space_id))
    }

    /// Direct entry with an optional email and password
    pub async fn evaluate_access(
        &self,
        space_id: &SpaceId,
        credentials: &AccessCredentials,
    ) -> AccessResult<AccessOutcome> {
        let config = self.load_space(space_id)?;

        // Password verification is CPU-bound
        let store = self.store.clone();
        let supplied = credentials.clone();
        let decision = tokio::task::spawn_blocking(move || {
            evaluate(&config, &supplied, store.as_ref())
        })
        .await??;

        let admission = match decision {
            AccessDecision::Admit(admission) => admission,
            AccessDecision::Deny(reason) => {
                metrics::access_decision("direct", reason.as_str());
                debug!(space_id = %space_id, reason = reason.as_str(), "Access denied");
                return Ok(AccessOutcome::Denied(reason));
            }
        };

        let session = self.sessions.create(space_id, &admission.identity).await?;

        if let Some(email) = &admission.stakeholder {
            if let Err(e) = self.store.mark_joined(space_id, email, self.clock.now()) {
                self.revoke_quietly(space_id, &session).await;
                return Err(e.into());
            }
        }

        metrics::access_decision("direct", "granted");
        info!(space_id = %space_id, anonymous = admission.identity.email().is_none(), "Access granted");

        Ok(AccessOutcome::Granted(AccessGrant {
            identity: admission.identity,
            session,
        }))
    }

    /// Email a magic link to `email` if it is a stakeholder of the space.
    ///
    /// The outcome for an unknown email is identical to a known one.
    pub async fn request_magic_link(
        &self,
        space_id: &SpaceId,
        email: &str,
    ) -> AccessResult<LinkRequestOutcome> {
        let config = self.load_space(space_id)?;

        if let Some(denial) = config.status.entry_denial() {
            return Ok(LinkRequestOutcome::Denied(denial.into()));
        }

        let Some(email) = EmailAddress::parse(email) else {
            return Ok(LinkRequestOutcome::Accepted);
        };

        if let Some(issued) = self.issuer.issue(space_id, &email)? {
            metrics::magic_link_issued();
            info!(space_id = %space_id, token_id = %issued.record.id, "Magic link issued");
            self.send_magic_link(&config, &issued).await;
        }

        Ok(LinkRequestOutcome::Accepted)
    }

    /// Exchange a magic-link token for a session. Succeeds at most once per token.
    pub async fn redeem_magic_link(
        &self,
        space_id: &SpaceId,
        token: &str,
    ) -> AccessResult<AccessOutcome> {
        let config = self.load_space(space_id)?;

        if let Some(denial) = config.status.entry_denial() {
            let reason = DenyReason::from(denial);
            metrics::access_decision("magic_link", reason.as_str());
            return Ok(AccessOutcome::Denied(reason));
        }

        let Some(record) = self.validator.find_redeemable(space_id, token)? else {
            return Ok(self.link_denied("invalid"));
        };

        // Removed members' outstanding links stop working
        if self.store.find_stakeholder(space_id, &record.email)?.is_none() {
            debug!(space_id = %space_id, token_id = %record.id, "Link owner is no longer a stakeholder");
            return Ok(self.link_denied("invalid"));
        }

        let identity = VisitorIdentity::Email(record.email.clone());
        let session = self.sessions.create(space_id, &identity).await?;

        // The token is consumed last, so it is never spent without a live session
        match self.validator.redeem(space_id, token) {
            Ok(Some(redeemed)) => {
                metrics::magic_link_redemption("redeemed");
                metrics::access_decision("magic_link", "granted");
                info!(space_id = %space_id, token_id = %redeemed.id, "Magic link redeemed");

                Ok(AccessOutcome::Granted(AccessGrant { identity, session }))
            }
            Ok(None) => {
                self.revoke_quietly(space_id, &session).await;
                Ok(self.link_denied("lost_race"))
            }
            Err(e) => {
                self.revoke_quietly(space_id, &session).await;
                Err(e.into())
            }
        }
    }

    /// Resolve a session credential presented to `space_id`
    pub async fn verify_session(
        &self,
        space_id: &SpaceId,
        credential: &SessionCredential,
    ) -> AccessResult<Option<VisitorIdentity>> {
        Ok(self.sessions.verify(space_id, credential).await?)
    }

    /// Everything the entry page shows before the visitor submits anything
    pub async fn access_prompt(&self, space_id: &SpaceId) -> AccessResult<AccessPrompt> {
        let config = self.load_space(space_id)?;
        let policy = AccessPolicy::compile(&config);

        let logo_url = match &config.branding.logo_path {
            Some(path) => match self.signer.sign(path, self.config.branding_url_ttl).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(space_id = %space_id, error = %e, "Branding logo unavailable");
                    None
                }
            },
            None => None,
        };

        Ok(AccessPrompt {
            space_name: config.name.clone(),
            brand_color: config.branding.brand_color.clone(),
            logo_url,
            access_mode: config.access_mode,
            requires_email: policy.requires_email(),
            requires_password: policy.requires_password(),
            auto_admit: policy.is_auto_admit(),
            denial: config.status.entry_denial().map(DenyReason::from),
        })
    }

    /// Link a visitor follows to redeem `token`
    pub fn magic_link_url(&self, space_id: &SpaceId, token: &RawToken) -> String {
        format!(
            "{}/portal/{}/enter?token={}",
            self.config.public_base_url.trim_end_matches('/'),
            space_id,
            token.as_str()
        )
    }

    async fn send_magic_link(&self, config: &SpaceAccessConfig, issued: &IssuedToken) {
        let payload = serde_json::json!({
            "space_name": config.name,
            "link": self.magic_link_url(&config.id, &issued.token),
            "expires_at": issued.record.expires_at.as_millis(),
        });

        if let Err(e) = self
            .mailer
            .send(&issued.record.email, MailTemplate::MagicLink, payload)
            .await
        {
            warn!(space_id = %config.id, token_id = %issued.record.id, error = %e, "Magic link email failed");
        }
    }

    fn link_denied(&self, result: &'static str) -> AccessOutcome {
        let reason = DenyReason::LinkInvalidOrExpired;
        metrics::magic_link_redemption(result);
        metrics::access_decision("magic_link", reason.as_str());
        AccessOutcome::Denied(reason)
    }

    async fn revoke_quietly(&self, space_id: &SpaceId, session: &SessionCredential) {
        if let Err(e) = self.sessions.revoke(space_id, session).await {
            warn!(space_id = %space_id, error = %e, "Failed to revoke session");
        }
    }
}
