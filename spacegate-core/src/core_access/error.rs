//! Access service errors
//!
//! Only failures that are not the visitor's fault surface here. Denials are
//! ordinary return values (see [`super::DenyReason`]).

use super::session::SessionError;
use crate::core_space::SpaceId;
use crate::core_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    /// No such space; callers map this to a not-found response
    #[error("Space not found: {0}")]
    SpaceNotFound(SpaceId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Access evaluation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type AccessResult<T> = Result<T, AccessError>;
