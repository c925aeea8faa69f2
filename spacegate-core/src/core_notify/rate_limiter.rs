/*
    Rate Limiter - Per-recipient notification email throttling

    At most one notification email per (recipient, space) within a rolling
    window. The send log lives in the shared store, so the limit holds
    across every process serving the portal, and the check-and-record is a
    single conditional insert: two concurrent callers cannot both be told
    to send. A claimed slot whose email fails is released, so only
    delivered emails count against the window.
*/

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core_space::{Clock, EmailAddress, SpaceId, Timestamp};
use crate::core_store::{PortalStore, StoreResult};

/// Rolling-window email limiter backed by the store's send log
pub struct NotificationRateLimiter {
    store: Arc<dyn PortalStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl NotificationRateLimiter {
    pub fn new(store: Arc<dyn PortalStore>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        NotificationRateLimiter {
            store,
            clock,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `true` when an email already went to `recipient` for `space_id`
    /// within the window. `false` means this caller now owns the send slot
    /// and is expected to send.
    pub fn should_suppress(&self, recipient: &EmailAddress, space_id: &SpaceId) -> StoreResult<bool> {
        Ok(self.try_claim(recipient, space_id)?.is_none())
    }

    /// Claim the send slot, or `None` when the email is suppressed
    pub fn try_claim(&self, recipient: &EmailAddress, space_id: &SpaceId) -> StoreResult<Option<EmailSlot>> {
        let now = self.clock.now();
        let claimed = self
            .store
            .claim_email_slot(space_id, recipient, now.minus(self.window), now)?;

        if !claimed {
            debug!(space_id = %space_id, "Notification email suppressed by rate limit");
            return Ok(None);
        }

        Ok(Some(EmailSlot {
            space_id: *space_id,
            recipient: recipient.clone(),
            claimed_at: now,
        }))
    }

    /// Release a slot whose email was not delivered
    pub fn release(&self, slot: &EmailSlot) -> StoreResult<()> {
        self.store
            .release_email_slot(&slot.space_id, &slot.recipient, slot.claimed_at)
    }
}

/// A claimed right to send one email to a recipient for a space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSlot {
    space_id: SpaceId,
    recipient: EmailAddress,
    claimed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_space::SpaceAccessConfig;
    use crate::core_store::{SpaceStore, SqlPortalStore};
    use crate::test_utils::ManualClock;

    fn limiter() -> (NotificationRateLimiter, Arc<ManualClock>, SpaceId) {
        let store = Arc::new(SqlPortalStore::memory().unwrap());
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)));
        let space = SpaceAccessConfig::new("Limits".to_string(), clock.now());
        store.insert_space(&space).unwrap();

        (
            NotificationRateLimiter::new(store, clock.clone(), Duration::from_secs(300)),
            clock,
            space.id,
        )
    }

    #[test]
    fn test_one_email_per_window() {
        let (limiter, clock, space_id) = limiter();
        let recipient = EmailAddress::parse("a@x.com").unwrap();

        assert!(!limiter.should_suppress(&recipient, &space_id).unwrap());

        clock.advance(Duration::from_secs(30));
        assert!(limiter.should_suppress(&recipient, &space_id).unwrap());

        clock.advance(Duration::from_secs(270));
        assert!(!limiter.should_suppress(&recipient, &space_id).unwrap());
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _, space_id) = limiter();
        let a = EmailAddress::parse("a@x.com").unwrap();
        let b = EmailAddress::parse("b@x.com").unwrap();

        assert!(!limiter.should_suppress(&a, &space_id).unwrap());
        assert!(!limiter.should_suppress(&b, &space_id).unwrap());
        assert!(!limiter.should_suppress(&a, &SpaceId::generate()).unwrap());
        assert!(limiter.should_suppress(&a, &space_id).unwrap());
    }

    #[test]
    fn test_released_slot_is_reusable_inside_window() {
        let (limiter, clock, space_id) = limiter();
        let recipient = EmailAddress::parse("a@x.com").unwrap();

        let slot = limiter.try_claim(&recipient, &space_id).unwrap().unwrap();
        limiter.release(&slot).unwrap();

        clock.advance(Duration::from_secs(10));
        assert!(limiter.try_claim(&recipient, &space_id).unwrap().is_some());
        assert!(limiter.should_suppress(&recipient, &space_id).unwrap());
    }

    #[test]
    fn test_recipient_is_case_insensitive() {
        let (limiter, _, space_id) = limiter();
        let lower = EmailAddress::parse("a@x.com").unwrap();
        let upper = EmailAddress::parse("A@X.COM").unwrap();

        assert!(!limiter.should_suppress(&lower, &space_id).unwrap());
        assert!(limiter.should_suppress(&upper, &space_id).unwrap());
    }
}
