//! Third-party integrations (Slack, Teams, generic webhooks)
//!
//! Only event routing and credential storage live here; the HTTP delivery
//! itself belongs to the host application.

pub mod events;
pub mod vault;

pub use events::{EnabledEvents, IntegrationEvent, LEGACY_ALIASES};
pub use vault::{IntegrationCredentials, IntegrationRecord, IntegrationVault, VaultError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationProvider {
    Slack,
    Teams,
    Webhook,
}

impl IntegrationProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationProvider::Slack => "slack",
            IntegrationProvider::Teams => "teams",
            IntegrationProvider::Webhook => "webhook",
        }
    }
}

impl fmt::Display for IntegrationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slack" => Ok(IntegrationProvider::Slack),
            "teams" => Ok(IntegrationProvider::Teams),
            "webhook" => Ok(IntegrationProvider::Webhook),
            other => Err(format!("unknown integration provider: {}", other)),
        }
    }
}
