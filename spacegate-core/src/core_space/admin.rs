//! Vendor-side space management
//!
//! Access settings, allowlist membership and lifecycle transitions. Status
//! changes go through the transition table and are written with a
//! compare-and-set against the status that was validated, so a concurrent
//! change is reported instead of overwritten.

use super::lifecycle::{validate_transition, LifecycleError, SpaceStatus};
use super::space::{AccessMode, Branding, MemberRole, SpaceAccessConfig, SpaceMember};
use super::types::{Clock, EmailAddress, SpaceId};
use crate::core_access::password::{hash_password, PasswordError};
use crate::core_store::{PortalStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SpaceAdminError {
    #[error("Space not found: {0}")]
    SpaceNotFound(SpaceId),

    #[error(transparent)]
    InvalidTransition(#[from] LifecycleError),

    #[error("Space {space_id} changed status concurrently (expected {expected})")]
    ConcurrentStatusChange {
        space_id: SpaceId,
        expected: SpaceStatus,
    },

    #[error("Invalid email address")]
    InvalidEmail,

    #[error(transparent)]
    PasswordHash(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SpaceAdminResult<T> = Result<T, SpaceAdminError>;

pub struct SpaceAdmin {
    store: Arc<dyn PortalStore>,
    clock: Arc<dyn Clock>,
}

impl SpaceAdmin {
    pub fn new(store: Arc<dyn PortalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a draft space with public access and no gates
    pub fn create_space(&self, name: &str) -> SpaceAdminResult<SpaceAccessConfig> {
        let space = SpaceAccessConfig::new(name.trim().to_string(), self.clock.now());
        self.store.insert_space(&space)?;

        info!(space_id = %space.id, "Space created");
        Ok(space)
    }

    pub fn get_space(&self, space_id: &SpaceId) -> SpaceAdminResult<SpaceAccessConfig> {
        self.store
            .get_space(space_id)?
            .ok_or(SpaceAdminError::SpaceNotFound(*space_id))
    }

    fn update<F>(&self, space_id: &SpaceId, apply: F) -> SpaceAdminResult<SpaceAccessConfig>
    where
        F: FnOnce(&mut SpaceAccessConfig),
    {
        let mut space = self.get_space(space_id)?;
        apply(&mut space);
        space.updated_at = self.clock.now();

        if !self.store.update_access_settings(&space)? {
            return Err(SpaceAdminError::SpaceNotFound(*space_id));
        }

        Ok(space)
    }

    pub fn set_access_mode(&self, space_id: &SpaceId, mode: AccessMode) -> SpaceAdminResult<SpaceAccessConfig> {
        self.update(space_id, |space| space.access_mode = mode)
    }

    /// Set the portal password, or clear it with `None`
    pub fn set_password(
        &self,
        space_id: &SpaceId,
        password: Option<&str>,
    ) -> SpaceAdminResult<SpaceAccessConfig> {
        let hash = password.map(hash_password).transpose()?;
        self.update(space_id, |space| space.password_hash = hash)
    }

    pub fn set_require_email(&self, space_id: &SpaceId, required: bool) -> SpaceAdminResult<SpaceAccessConfig> {
        self.update(space_id, |space| space.require_email_for_analytics = required)
    }

    pub fn set_branding(&self, space_id: &SpaceId, branding: Branding) -> SpaceAdminResult<SpaceAccessConfig> {
        self.update(space_id, |space| space.branding = branding)
    }

    /// Add or re-role a member. An existing `joined_at` is preserved.
    pub fn add_member(
        &self,
        space_id: &SpaceId,
        email: &str,
        role: MemberRole,
    ) -> SpaceAdminResult<SpaceMember> {
        self.get_space(space_id)?;
        let email = EmailAddress::parse(email).ok_or(SpaceAdminError::InvalidEmail)?;

        self.store.upsert_member(&SpaceMember {
            space_id: *space_id,
            email: email.clone(),
            role,
            invited_at: self.clock.now(),
            joined_at: None,
        })?;

        self.store
            .find_member(space_id, &email)?
            .ok_or(SpaceAdminError::SpaceNotFound(*space_id))
    }

    /// Returns whether a member was removed
    pub fn remove_member(&self, space_id: &SpaceId, email: &str) -> SpaceAdminResult<bool> {
        let email = EmailAddress::parse(email).ok_or(SpaceAdminError::InvalidEmail)?;
        Ok(self.store.remove_member(space_id, &email)?)
    }

    pub fn list_members(&self, space_id: &SpaceId) -> SpaceAdminResult<Vec<SpaceMember>> {
        Ok(self.store.list_members(space_id)?)
    }

    /// Move a space to `to`, validated against the current persisted status
    pub fn transition_status(&self, space_id: &SpaceId, to: SpaceStatus) -> SpaceAdminResult<SpaceAccessConfig> {
        let current = self.get_space(space_id)?;
        let from = current.status;
        validate_transition(from, to)?;

        let now = self.clock.now();
        if !self.store.compare_and_set_status(space_id, from, to, now)? {
            return Err(SpaceAdminError::ConcurrentStatusChange {
                space_id: *space_id,
                expected: from,
            });
        }

        info!(space_id = %space_id, from = %from, to = %to, "Space status changed");

        Ok(SpaceAccessConfig {
            status: to,
            updated_at: now,
            ..current
        })
    }
}
