//! Persistent storage for spaces, members, access tokens, notifications and
//! integration settings.
//!
//! The storage traits are the seam between the access-control core and the
//! database. Every mutation that guards a security decision (token
//! redemption, status change, email send slot) is a single conditional
//! statement so concurrent callers cannot both win.

pub mod errors;
pub mod migrations;
pub mod sql_store;

pub use errors::{StoreError, StoreResult};
pub use sql_store::SqlPortalStore;

use crate::core_access::token::AccessToken;
use crate::core_integrations::vault::IntegrationRecord;
use crate::core_integrations::IntegrationProvider;
use crate::core_notify::notification::InAppNotification;
use crate::core_space::{EmailAddress, SpaceAccessConfig, SpaceId, SpaceMember, SpaceStatus, Timestamp};
use uuid::Uuid;

/// Space rows
pub trait SpaceStore: Send + Sync {
    /// Insert a new Space
    fn insert_space(&self, space: &SpaceAccessConfig) -> StoreResult<()>;

    /// Get a Space by ID
    fn get_space(&self, space_id: &SpaceId) -> StoreResult<Option<SpaceAccessConfig>>;

    /// Persist name, access settings and branding. Status is not touched.
    fn update_access_settings(&self, space: &SpaceAccessConfig) -> StoreResult<bool>;

    /// Set `status = to` only while the stored status is still `expected`
    fn compare_and_set_status(
        &self,
        space_id: &SpaceId,
        expected: SpaceStatus,
        to: SpaceStatus,
        now: Timestamp,
    ) -> StoreResult<bool>;
}

/// Space allowlist rows
pub trait MemberStore: Send + Sync {
    /// Insert a member, or update the role of an existing one. `joined_at` is kept.
    fn upsert_member(&self, member: &SpaceMember) -> StoreResult<()>;

    fn remove_member(&self, space_id: &SpaceId, email: &EmailAddress) -> StoreResult<bool>;

    /// Case-insensitive lookup
    fn find_member(&self, space_id: &SpaceId, email: &EmailAddress) -> StoreResult<Option<SpaceMember>>;

    fn list_members(&self, space_id: &SpaceId) -> StoreResult<Vec<SpaceMember>>;

    /// Stamp `joined_at` if it is still unset. Returns whether it was stamped.
    fn mark_joined(&self, space_id: &SpaceId, email: &EmailAddress, now: Timestamp) -> StoreResult<bool>;

    /// Stakeholder lookup used by the access evaluator
    fn find_stakeholder(
        &self,
        space_id: &SpaceId,
        email: &EmailAddress,
    ) -> StoreResult<Option<SpaceMember>> {
        Ok(self
            .find_member(space_id, email)?
            .filter(SpaceMember::is_stakeholder))
    }
}

/// Magic-link token rows. Tokens are addressed by the SHA-256 digest of
/// their value and are never deleted.
pub trait TokenStore: Send + Sync {
    fn insert_token(&self, token: &AccessToken) -> StoreResult<()>;

    /// Read-only lookup of an unused, unexpired token
    fn find_redeemable_token(
        &self,
        space_id: &SpaceId,
        token_hash: &str,
        now: Timestamp,
    ) -> StoreResult<Option<AccessToken>>;

    /// Atomically mark an unused, unexpired token as used and stamp the
    /// owner's `joined_at`. Returns `None` when nothing was redeemed.
    fn redeem_token(
        &self,
        space_id: &SpaceId,
        token_hash: &str,
        now: Timestamp,
    ) -> StoreResult<Option<AccessToken>>;

    /// Audit trail for one email in one space, newest first
    fn list_tokens(&self, space_id: &SpaceId, email: &EmailAddress) -> StoreResult<Vec<AccessToken>>;
}

/// In-app notifications and the outbound email log
pub trait NotificationStore: Send + Sync {
    /// Record an email send for `(recipient, space)` unless one exists with
    /// `sent_at > window_start`. Returns whether the slot was claimed.
    fn claim_email_slot(
        &self,
        space_id: &SpaceId,
        recipient: &EmailAddress,
        window_start: Timestamp,
        now: Timestamp,
    ) -> StoreResult<bool>;

    /// Give back a slot claimed at `sent_at` whose email never went out
    fn release_email_slot(
        &self,
        space_id: &SpaceId,
        recipient: &EmailAddress,
        sent_at: Timestamp,
    ) -> StoreResult<()>;

    fn insert_notification(&self, notification: &InAppNotification) -> StoreResult<()>;

    fn mark_notification_emailed(&self, id: &Uuid) -> StoreResult<()>;

    fn list_notifications(
        &self,
        space_id: &SpaceId,
        recipient: &EmailAddress,
    ) -> StoreResult<Vec<InAppNotification>>;
}

/// Third-party integration settings
pub trait IntegrationStore: Send + Sync {
    fn upsert_integration(&self, record: &IntegrationRecord) -> StoreResult<()>;

    fn get_integration(
        &self,
        space_id: &SpaceId,
        provider: IntegrationProvider,
    ) -> StoreResult<Option<IntegrationRecord>>;
}

/// Everything the portal needs from storage
pub trait PortalStore:
    SpaceStore + MemberStore + TokenStore + NotificationStore + IntegrationStore
{
}

impl<T> PortalStore for T where
    T: SpaceStore + MemberStore + TokenStore + NotificationStore + IntegrationStore
{
}
