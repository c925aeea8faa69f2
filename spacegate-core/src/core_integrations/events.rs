//! Integration event names
//!
//! Event kinds are a closed set. Names written by older releases are
//! migrated through [`LEGACY_ALIASES`] when read back.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntegrationEvent {
    TaskCompleted,
    FormSubmitted,
    FileUploaded,
    MessagePosted,
    StakeholderJoined,
    SpaceStatusChanged,
}

/// Legacy name -> current event
pub const LEGACY_ALIASES: &[(&str, IntegrationEvent)] = &[
    ("form.answered", IntegrationEvent::FormSubmitted),
    ("file.added", IntegrationEvent::FileUploaded),
    ("comment.created", IntegrationEvent::MessagePosted),
];

impl IntegrationEvent {
    pub const ALL: [IntegrationEvent; 6] = [
        IntegrationEvent::TaskCompleted,
        IntegrationEvent::FormSubmitted,
        IntegrationEvent::FileUploaded,
        IntegrationEvent::MessagePosted,
        IntegrationEvent::StakeholderJoined,
        IntegrationEvent::SpaceStatusChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationEvent::TaskCompleted => "task.completed",
            IntegrationEvent::FormSubmitted => "form.submitted",
            IntegrationEvent::FileUploaded => "file.uploaded",
            IntegrationEvent::MessagePosted => "message.posted",
            IntegrationEvent::StakeholderJoined => "stakeholder.joined",
            IntegrationEvent::SpaceStatusChanged => "space.status_changed",
        }
    }

    /// Parse a canonical or legacy event name
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();

        Self::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == name)
            .or_else(|| {
                LEGACY_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, event)| *event)
            })
    }
}

impl fmt::Display for IntegrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events an integration is subscribed to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnabledEvents {
    events: Vec<IntegrationEvent>,
}

impl EnabledEvents {
    pub fn new(events: impl IntoIterator<Item = IntegrationEvent>) -> Self {
        let mut events: Vec<_> = events.into_iter().collect();
        events.sort();
        events.dedup();
        EnabledEvents { events }
    }

    /// Read a stored name list. Aliases are migrated, unknown names dropped.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(names.iter().filter_map(|name| {
            let name = name.as_ref();
            let event = IntegrationEvent::parse(name);
            if event.is_none() {
                warn!(event = name, "Dropping unknown integration event");
            }
            event
        }))
    }

    /// Canonical names, for storage
    pub fn to_names(&self) -> Vec<String> {
        self.events.iter().map(|e| e.as_str().to_string()).collect()
    }

    pub fn is_enabled(&self, event: IntegrationEvent) -> bool {
        self.events.contains(&event)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = IntegrationEvent> + '_ {
        self.events.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_parse() {
        for event in IntegrationEvent::ALL {
            assert_eq!(IntegrationEvent::parse(event.as_str()), Some(event));
        }
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(
            IntegrationEvent::parse("form.answered"),
            Some(IntegrationEvent::FormSubmitted)
        );
        assert_eq!(
            IntegrationEvent::parse("file.added"),
            Some(IntegrationEvent::FileUploaded)
        );
        assert_eq!(
            IntegrationEvent::parse("comment.created"),
            Some(IntegrationEvent::MessagePosted)
        );
        assert_eq!(IntegrationEvent::parse("task.deleted"), None);
    }

    #[test]
    fn test_enabled_events_migrate_and_dedupe() {
        let enabled = EnabledEvents::from_names(&["form.answered", "form.submitted", "bogus"]);

        assert!(enabled.is_enabled(IntegrationEvent::FormSubmitted));
        assert!(!enabled.is_enabled(IntegrationEvent::TaskCompleted));
        assert_eq!(enabled.to_names(), vec!["form.submitted".to_string()]);
    }
}
