//! Type definitions shared by the space, access and notification modules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a Space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceId(pub Uuid);

impl SpaceId {
    /// Create a new random SpaceId
    pub fn generate() -> Self {
        SpaceId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpaceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(SpaceId)
    }
}

impl From<Uuid> for SpaceId {
    fn from(id: Uuid) -> Self {
        SpaceId(id)
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp representing the current time
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }

    /// Create a timestamp from milliseconds since epoch
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Get milliseconds since epoch
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Timestamp `duration` later, saturating at the end of time
    pub fn plus(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// Timestamp `duration` earlier, saturating at the epoch
    pub fn minus(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration.as_millis() as u64))
    }

    /// Storage representation (SQLite INTEGER)
    pub fn as_sql(&self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }

    pub fn from_sql(value: i64) -> Self {
        Timestamp(value.max(0) as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the current time.
///
/// Every expiry and recency decision reads the time through a `Clock` so
/// that token expiry and notification windows can be exercised in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A normalised (trimmed, lower-cased) email address or visitor identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Normalise user input. Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(EmailAddress(normalized))
        }
    }

    /// Generate a pseudonymous visitor identifier for analytics-only email capture
    pub fn pseudonymous() -> Self {
        EmailAddress(format!("visitor-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_id_generation() {
        let id1 = SpaceId::generate();
        let id2 = SpaceId::generate();
        assert_ne!(id1, id2, "Generated IDs should be unique");
    }

    #[test]
    fn test_space_id_parse_display() {
        let id = SpaceId::generate();
        let parsed: SpaceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<SpaceId>().is_err());
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_millis(10_000);
        assert_eq!(t.plus(Duration::from_secs(1)).as_millis(), 11_000);
        assert_eq!(t.minus(Duration::from_secs(20)).as_millis(), 0);
        assert_eq!(Timestamp::from_sql(-5), Timestamp(0));
    }

    #[test]
    fn test_email_normalization() {
        let email = EmailAddress::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert!(EmailAddress::parse("   ").is_none());
        assert!(EmailAddress::parse("").is_none());
    }

    #[test]
    fn test_pseudonymous_ids_are_distinct() {
        let a = EmailAddress::pseudonymous();
        let b = EmailAddress::pseudonymous();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("visitor-"));
    }
}
