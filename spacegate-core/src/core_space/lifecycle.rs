//! Space lifecycle status and the transition table
//!
//! The table in [`allowed_transitions`] is the only source of truth for which
//! status changes are legal. Both the vendor-side admin operations and the
//! external access path read it; nothing else should compare statuses ad hoc.
//!
//! ```text
//! draft     -> active, archived
//! active    -> completed, archived
//! completed -> active, archived
//! archived  -> draft, active
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse lifecycle state of a Space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceStatus {
    /// Being prepared by the vendor, not yet visible to stakeholders
    Draft,
    /// Live implementation
    Active,
    /// Implementation finished, still readable
    Completed,
    /// Retired
    Archived,
}

/// Why a space cannot be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryDenial {
    /// The space is still a draft
    NotReady,
    /// The space has been archived
    NoLongerAvailable,
}

impl EntryDenial {
    pub fn message(&self) -> &'static str {
        match self {
            EntryDenial::NotReady => "This space is not ready yet.",
            EntryDenial::NoLongerAvailable => "This space is no longer available.",
        }
    }
}

impl SpaceStatus {
    pub const ALL: [SpaceStatus; 4] = [
        SpaceStatus::Draft,
        SpaceStatus::Active,
        SpaceStatus::Completed,
        SpaceStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceStatus::Draft => "draft",
            SpaceStatus::Active => "active",
            SpaceStatus::Completed => "completed",
            SpaceStatus::Archived => "archived",
        }
    }

    /// Whether external visitors may enter a space in this status
    pub fn can_enter(&self) -> bool {
        self.entry_denial().is_none()
    }

    /// The user-facing reason entry is refused, if it is
    pub fn entry_denial(&self) -> Option<EntryDenial> {
        match self {
            SpaceStatus::Active | SpaceStatus::Completed => None,
            SpaceStatus::Draft => Some(EntryDenial::NotReady),
            SpaceStatus::Archived => Some(EntryDenial::NoLongerAvailable),
        }
    }
}

impl fmt::Display for SpaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(SpaceStatus::Draft),
            "active" => Ok(SpaceStatus::Active),
            "completed" => Ok(SpaceStatus::Completed),
            "archived" => Ok(SpaceStatus::Archived),
            other => Err(LifecycleError::UnknownStatus(other.to_string())),
        }
    }
}

/// Statuses reachable from `from` in one step
pub fn allowed_transitions(from: SpaceStatus) -> &'static [SpaceStatus] {
    match from {
        SpaceStatus::Draft => &[SpaceStatus::Active, SpaceStatus::Archived],
        SpaceStatus::Active => &[SpaceStatus::Completed, SpaceStatus::Archived],
        SpaceStatus::Completed => &[SpaceStatus::Active, SpaceStatus::Archived],
        SpaceStatus::Archived => &[SpaceStatus::Draft, SpaceStatus::Active],
    }
}

pub fn can_transition(from: SpaceStatus, to: SpaceStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Reject any transition that is not in the table
pub fn validate_transition(from: SpaceStatus, to: SpaceStatus) -> Result<(), LifecycleError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { from, to })
    }
}

/// Lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: SpaceStatus, to: SpaceStatus },

    #[error("Unknown space status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TABLE: &[(SpaceStatus, SpaceStatus)] = &[
        (SpaceStatus::Draft, SpaceStatus::Active),
        (SpaceStatus::Draft, SpaceStatus::Archived),
        (SpaceStatus::Active, SpaceStatus::Completed),
        (SpaceStatus::Active, SpaceStatus::Archived),
        (SpaceStatus::Completed, SpaceStatus::Active),
        (SpaceStatus::Completed, SpaceStatus::Archived),
        (SpaceStatus::Archived, SpaceStatus::Draft),
        (SpaceStatus::Archived, SpaceStatus::Active),
    ];

    fn any_status() -> impl Strategy<Value = SpaceStatus> {
        prop::sample::select(SpaceStatus::ALL.to_vec())
    }

    #[test]
    fn test_can_enter() {
        assert!(SpaceStatus::Active.can_enter());
        assert!(SpaceStatus::Completed.can_enter());
        assert!(!SpaceStatus::Draft.can_enter());
        assert!(!SpaceStatus::Archived.can_enter());
    }

    #[test]
    fn test_entry_denials_are_distinct() {
        let draft = SpaceStatus::Draft.entry_denial().unwrap();
        let archived = SpaceStatus::Archived.entry_denial().unwrap();
        assert_eq!(draft, EntryDenial::NotReady);
        assert_eq!(archived, EntryDenial::NoLongerAvailable);
        assert_ne!(draft.message(), archived.message());
    }

    #[test]
    fn test_self_transitions_rejected() {
        for status in SpaceStatus::ALL {
            assert!(!can_transition(status, status));
        }
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = validate_transition(SpaceStatus::Draft, SpaceStatus::Completed).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: SpaceStatus::Draft,
                to: SpaceStatus::Completed
            }
        );
        assert_eq!(err.to_string(), "Invalid status transition from draft to completed");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Active".parse::<SpaceStatus>().unwrap(), SpaceStatus::Active);
        assert!("paused".parse::<SpaceStatus>().is_err());
        for status in SpaceStatus::ALL {
            assert_eq!(status.as_str().parse::<SpaceStatus>().unwrap(), status);
        }
    }

    proptest! {
        #[test]
        fn prop_transition_matches_table(from in any_status(), to in any_status()) {
            let listed = TABLE.contains(&(from, to));
            prop_assert_eq!(can_transition(from, to), listed);
            prop_assert_eq!(validate_transition(from, to).is_ok(), listed);
        }
    }
}
