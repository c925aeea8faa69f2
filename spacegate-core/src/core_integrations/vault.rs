//! Persisted third-party integration settings
//!
//! Webhook tokens are sealed with the process-wide [`SecretSealer`] before
//! they reach the store and unsealed on read. An unseal failure is raised,
//! never replaced with an empty or partial token.

use super::events::{EnabledEvents, IntegrationEvent};
use super::IntegrationProvider;
use crate::core_credentials::{CredentialError, SecretSealer};
use crate::core_space::{Clock, SpaceId, Timestamp};
use crate::core_store::{PortalStore, StoreError};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Stored row: the token is in sealed form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub space_id: SpaceId,
    pub provider: IntegrationProvider,
    pub webhook_url: String,
    pub sealed_token: String,
    /// Canonical event names
    pub enabled_events: Vec<String>,
    pub updated_at: Timestamp,
}

/// Unsealed settings, ready for delivery
#[derive(Debug, Clone)]
pub struct IntegrationCredentials {
    pub webhook_url: String,
    pub token: SecretString,
    pub events: EnabledEvents,
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("No {provider} integration for space {space_id}")]
    NotConnected {
        space_id: SpaceId,
        provider: IntegrationProvider,
    },

    #[error("Webhook URL must not be empty")]
    MissingWebhookUrl,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct IntegrationVault {
    store: Arc<dyn PortalStore>,
    sealer: SecretSealer,
    clock: Arc<dyn Clock>,
}

impl IntegrationVault {
    pub fn new(store: Arc<dyn PortalStore>, sealer: SecretSealer, clock: Arc<dyn Clock>) -> Self {
        Self { store, sealer, clock }
    }

    /// Save (or replace) a provider's settings for a space
    pub fn connect(
        &self,
        space_id: &SpaceId,
        provider: IntegrationProvider,
        webhook_url: &str,
        token: &str,
        events: &[IntegrationEvent],
    ) -> Result<(), VaultError> {
        let webhook_url = webhook_url.trim();
        if webhook_url.is_empty() {
            return Err(VaultError::MissingWebhookUrl);
        }

        let record = IntegrationRecord {
            space_id: *space_id,
            provider,
            webhook_url: webhook_url.to_string(),
            sealed_token: self.sealer.seal(token)?,
            enabled_events: EnabledEvents::new(events.iter().copied()).to_names(),
            updated_at: self.clock.now(),
        };

        self.store.upsert_integration(&record)?;
        info!(space_id = %space_id, provider = %provider, encrypted = self.sealer.is_encrypted(), "Integration connected");

        Ok(())
    }

    /// Load and unseal a provider's settings
    pub fn credentials(
        &self,
        space_id: &SpaceId,
        provider: IntegrationProvider,
    ) -> Result<IntegrationCredentials, VaultError> {
        let record = self
            .store
            .get_integration(space_id, provider)?
            .ok_or(VaultError::NotConnected {
                space_id: *space_id,
                provider,
            })?;

        let token = self.sealer.unseal(&record.sealed_token).map_err(|e| {
            error!(space_id = %space_id, provider = %provider, error = %e, "Stored integration token unusable");
            e
        })?;

        Ok(IntegrationCredentials {
            webhook_url: record.webhook_url,
            token: SecretString::new(token),
            events: EnabledEvents::from_names(&record.enabled_events),
        })
    }

    /// Whether `event_name` should be forwarded to this provider.
    /// Unknown event names and unconnected providers are never delivered.
    pub fn should_deliver(
        &self,
        space_id: &SpaceId,
        provider: IntegrationProvider,
        event_name: &str,
    ) -> Result<bool, VaultError> {
        let Some(event) = IntegrationEvent::parse(event_name) else {
            return Ok(false);
        };

        match self.store.get_integration(space_id, provider)? {
            Some(record) => Ok(EnabledEvents::from_names(&record.enabled_events).is_enabled(event)),
            None => Ok(false),
        }
    }
}
