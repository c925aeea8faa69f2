//! Access policy evaluation
//!
//! A space's access settings are compiled into one [`AccessPolicy`] variant
//! and evaluated by a single exhaustive match, so every combination of
//! mode, password and email flags maps to exactly one admit or deny.
//!
//! Check order: lifecycle, then allowlist membership (restricted), then
//! password, then email capture (public), then admit.

use super::password::verify_password;
use crate::core_space::{AccessMode, EmailAddress, EntryDenial, SpaceAccessConfig, SpaceId};
use crate::core_store::{MemberStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Credentials a visitor supplied on the entry form
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AccessCredentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl AccessCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Normalised email; blank input counts as absent
    pub fn email(&self) -> Option<EmailAddress> {
        self.email.as_deref().and_then(EmailAddress::parse)
    }

    /// Supplied password; empty input counts as absent
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for AccessCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Identity a session is minted for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisitorIdentity {
    Email(EmailAddress),
    Anonymous,
}

impl VisitorIdentity {
    pub fn as_str(&self) -> &str {
        match self {
            VisitorIdentity::Email(email) => email.as_str(),
            VisitorIdentity::Anonymous => "anonymous",
        }
    }

    pub fn email(&self) -> Option<&EmailAddress> {
        match self {
            VisitorIdentity::Email(email) => Some(email),
            VisitorIdentity::Anonymous => None,
        }
    }
}

impl fmt::Display for VisitorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why entry was refused. Messages are shown to the visitor verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    NotReady,
    NoLongerAvailable,
    EmailRequired,
    PasswordRequired,
    /// Unknown member or wrong password; deliberately indistinguishable
    AccessDenied,
    /// Unknown, expired or already used link; deliberately indistinguishable
    LinkInvalidOrExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyCategory {
    /// The space cannot be entered at all right now
    Lifecycle,
    /// The visitor's credentials were missing or not accepted
    Authentication,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NotReady => EntryDenial::NotReady.message(),
            DenyReason::NoLongerAvailable => EntryDenial::NoLongerAvailable.message(),
            DenyReason::EmailRequired => "Please enter your email to continue.",
            DenyReason::PasswordRequired => "A password is required to access this space.",
            DenyReason::AccessDenied => "Access denied.",
            DenyReason::LinkInvalidOrExpired => "This link is invalid or has expired.",
        }
    }

    pub fn category(&self) -> DenyCategory {
        match self {
            DenyReason::NotReady | DenyReason::NoLongerAvailable => DenyCategory::Lifecycle,
            DenyReason::EmailRequired
            | DenyReason::PasswordRequired
            | DenyReason::AccessDenied
            | DenyReason::LinkInvalidOrExpired => DenyCategory::Authentication,
        }
    }

    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotReady => "not_ready",
            DenyReason::NoLongerAvailable => "no_longer_available",
            DenyReason::EmailRequired => "email_required",
            DenyReason::PasswordRequired => "password_required",
            DenyReason::AccessDenied => "access_denied",
            DenyReason::LinkInvalidOrExpired => "link_invalid",
        }
    }
}

impl From<EntryDenial> for DenyReason {
    fn from(denial: EntryDenial) -> Self {
        match denial {
            EntryDenial::NotReady => DenyReason::NotReady,
            EntryDenial::NoLongerAvailable => DenyReason::NoLongerAvailable,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A successful evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub identity: VisitorIdentity,
    /// Allowlisted member whose `joined_at` should be stamped
    pub stakeholder: Option<EmailAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Admit(Admission),
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_admit(&self) -> bool {
        matches!(self, AccessDecision::Admit(_))
    }
}

/// The entry gates of a space, as one tagged value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy<'a> {
    /// Public, no password, no email: auto-admit
    Open,
    /// Public, email collected for analytics only
    EmailCapture,
    /// Public with a portal password
    Password { hash: &'a str, capture_email: bool },
    /// Restricted to stakeholder members, optionally also password-protected
    Allowlist { password: Option<&'a str> },
}

impl<'a> AccessPolicy<'a> {
    pub fn compile(config: &'a SpaceAccessConfig) -> Self {
        let hash = config.password_hash.as_deref();

        match (config.access_mode, hash) {
            (AccessMode::Restricted, password) => AccessPolicy::Allowlist { password },
            (AccessMode::Public, Some(hash)) => AccessPolicy::Password {
                hash,
                capture_email: config.require_email_for_analytics,
            },
            (AccessMode::Public, None) if config.require_email_for_analytics => {
                AccessPolicy::EmailCapture
            }
            (AccessMode::Public, None) => AccessPolicy::Open,
        }
    }

    pub fn requires_email(&self) -> bool {
        match self {
            AccessPolicy::Open => false,
            AccessPolicy::EmailCapture => true,
            AccessPolicy::Password { capture_email, .. } => *capture_email,
            AccessPolicy::Allowlist { .. } => true,
        }
    }

    pub fn requires_password(&self) -> bool {
        match self {
            AccessPolicy::Open | AccessPolicy::EmailCapture => false,
            AccessPolicy::Password { .. } => true,
            AccessPolicy::Allowlist { password } => password.is_some(),
        }
    }

    /// No prompt is needed; the visitor is admitted as anonymous
    pub fn is_auto_admit(&self) -> bool {
        matches!(self, AccessPolicy::Open)
    }
}

fn check_password(space_id: &SpaceId, hash: &str, supplied: Option<&str>) -> Option<DenyReason> {
    let Some(password) = supplied else {
        return Some(DenyReason::PasswordRequired);
    };

    match verify_password(password, hash) {
        Ok(true) => None,
        Ok(false) => Some(DenyReason::AccessDenied),
        Err(e) => {
            warn!(space_id = %space_id, error = %e, "Space password hash cannot be verified");
            Some(DenyReason::AccessDenied)
        }
    }
}

fn public_identity(email: Option<EmailAddress>) -> VisitorIdentity {
    email.map_or(VisitorIdentity::Anonymous, VisitorIdentity::Email)
}

/// Decide whether a visitor may enter. Only store failures are errors;
/// every credential combination yields a decision.
pub fn evaluate<D>(
    config: &SpaceAccessConfig,
    credentials: &AccessCredentials,
    members: &D,
) -> StoreResult<AccessDecision>
where
    D: MemberStore + ?Sized,
{
    if let Some(denial) = config.status.entry_denial() {
        return Ok(AccessDecision::Deny(denial.into()));
    }

    let email = credentials.email();
    let password = credentials.password();

    let decision = match AccessPolicy::compile(config) {
        AccessPolicy::Open => AccessDecision::Admit(Admission {
            identity: public_identity(email),
            stakeholder: None,
        }),

        AccessPolicy::EmailCapture => match email {
            Some(email) => AccessDecision::Admit(Admission {
                identity: VisitorIdentity::Email(email),
                stakeholder: None,
            }),
            None => AccessDecision::Deny(DenyReason::EmailRequired),
        },

        AccessPolicy::Password { hash, capture_email } => {
            if let Some(reason) = check_password(&config.id, hash, password) {
                AccessDecision::Deny(reason)
            } else if capture_email && email.is_none() {
                AccessDecision::Deny(DenyReason::EmailRequired)
            } else {
                AccessDecision::Admit(Admission {
                    identity: public_identity(email),
                    stakeholder: None,
                })
            }
        }

        // Membership is checked before the password. A member who omits the
        // password gets PasswordRequired while a non-member gets AccessDenied,
        // so a bare email reveals membership. Accepted: the entry page must
        // prompt members for the password, and magic-link requests stay
        // uniform for known and unknown addresses.
        AccessPolicy::Allowlist { password: hash } => {
            let Some(email) = email else {
                return Ok(AccessDecision::Deny(DenyReason::EmailRequired));
            };

            if members.find_stakeholder(&config.id, &email)?.is_none() {
                debug!(space_id = %config.id, email = %email, "Not a stakeholder member");
                return Ok(AccessDecision::Deny(DenyReason::AccessDenied));
            }

            match hash.and_then(|hash| check_password(&config.id, hash, password)) {
                Some(reason) => AccessDecision::Deny(reason),
                None => AccessDecision::Admit(Admission {
                    identity: VisitorIdentity::Email(email.clone()),
                    stakeholder: Some(email),
                }),
            }
        }
    };

    Ok(decision)
}
