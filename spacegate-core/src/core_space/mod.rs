//! Spaces as seen by the access-control core
//!
//! A Space is a vendor-owned collaborative workspace that external
//! stakeholders enter through the portal. This module holds its access
//! configuration, allowlist membership, lifecycle status and the
//! vendor-side operations that change them.
//!
//! ## Key Invariants
//!
//! 1. Lifecycle status gates every entry path before anything else is checked
//! 2. Status changes follow the transition table in [`lifecycle`]
//! 3. Emails are compared case-insensitively

pub mod admin;
pub mod lifecycle;
pub mod space;
pub mod types;

pub use admin::{SpaceAdmin, SpaceAdminError, SpaceAdminResult};
pub use lifecycle::{
    allowed_transitions, can_transition, validate_transition, EntryDenial, LifecycleError,
    SpaceStatus,
};
pub use space::{AccessMode, Branding, MemberRole, SpaceAccessConfig, SpaceMember};
pub use types::{Clock, EmailAddress, SpaceId, SystemClock, Timestamp};
