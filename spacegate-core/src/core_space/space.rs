//! Space access configuration and membership records

use super::lifecycle::SpaceStatus;
use super::types::{EmailAddress, SpaceId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-space access configuration, one per Space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceAccessConfig {
    /// Unique identifier
    pub id: SpaceId,

    /// Human-readable name, shown on the entry page
    pub name: String,

    /// Who may attempt entry
    pub access_mode: AccessMode,

    /// Argon2 PHC hash of the portal password (never the plaintext)
    pub password_hash: Option<String>,

    /// Collect an email (or pseudonymous id) from public visitors
    pub require_email_for_analytics: bool,

    /// Lifecycle status, gates every access decision
    pub status: SpaceStatus,

    /// Cosmetic, carried through unchanged
    pub branding: Branding,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl SpaceAccessConfig {
    /// A new draft space with public access and no gates
    pub fn new(name: String, now: Timestamp) -> Self {
        SpaceAccessConfig {
            id: SpaceId::generate(),
            name,
            access_mode: AccessMode::Public,
            password_hash: None,
            require_email_for_analytics: false,
            status: SpaceStatus::Draft,
            branding: Branding::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Space access modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Anyone may attempt entry, subject to password/email gates
    Public,
    /// Entry limited to allowlisted stakeholder emails
    Restricted,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Public => "public",
            AccessMode::Restricted => "restricted",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(AccessMode::Public),
            "restricted" => Ok(AccessMode::Restricted),
            other => Err(format!("unknown access mode: {}", other)),
        }
    }
}

/// Branding shown on the access prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    /// Object-storage path of the logo; resolved to a signed URL for display
    pub logo_path: Option<String>,

    /// Hex colour, e.g. "#1f6feb"
    pub brand_color: Option<String>,
}

/// Space member information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceMember {
    pub space_id: SpaceId,

    /// Invited email, normalised
    pub email: EmailAddress,

    /// Role in the Space
    pub role: MemberRole,

    pub invited_at: Timestamp,

    /// First successful entry; set once, never reset
    pub joined_at: Option<Timestamp>,
}

impl SpaceMember {
    pub fn is_stakeholder(&self) -> bool {
        self.role == MemberRole::Stakeholder
    }
}

/// Space-level roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Vendor team member
    Staff,
    /// External customer stakeholder, eligible for restricted-mode access
    Stakeholder,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Staff => "staff",
            MemberRole::Stakeholder => "stakeholder",
        }
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(MemberRole::Staff),
            "stakeholder" => Ok(MemberRole::Stakeholder),
            other => Err(format!("unknown member role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_space_defaults() {
        let space = SpaceAccessConfig::new("Acme rollout".to_string(), Timestamp::from_millis(5));
        assert_eq!(space.status, SpaceStatus::Draft);
        assert_eq!(space.access_mode, AccessMode::Public);
        assert!(!space.has_password());
        assert!(!space.require_email_for_analytics);
        assert_eq!(space.created_at, space.updated_at);
    }

    #[test]
    fn test_access_mode_parsing() {
        assert_eq!("Restricted".parse::<AccessMode>().unwrap(), AccessMode::Restricted);
        assert_eq!("public".parse::<AccessMode>().unwrap(), AccessMode::Public);
        assert!("private".parse::<AccessMode>().is_err());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [MemberRole::Staff, MemberRole::Stakeholder] {
            assert_eq!(role.as_str().parse::<MemberRole>().unwrap(), role);
        }
    }
}
