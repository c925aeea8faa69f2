//! Mention and chat notifications
//!
//! The in-app record is always attempted; the email is gated by the rate
//! limiter. Nothing here returns an error: the mention or message that
//! triggered the notification has already succeeded.

use super::mailer::{MailTemplate, Mailer};
use super::notification::{InAppNotification, NotificationKind, NotificationRequest};
use super::rate_limiter::NotificationRateLimiter;
use crate::core_space::Clock;
use crate::core_store::PortalStore;
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to one notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// In-app record written
    pub recorded: bool,
    /// Email handed to the mailer successfully
    pub emailed: bool,
    /// Email skipped because one went out recently
    pub suppressed: bool,
}

pub struct NotificationDispatcher {
    store: Arc<dyn PortalStore>,
    limiter: NotificationRateLimiter,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn PortalStore>,
        limiter: NotificationRateLimiter,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            limiter,
            mailer,
            clock,
        }
    }

    pub async fn notify(&self, request: NotificationRequest) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let notification = InAppNotification::from_request(&request, self.clock.now());

        match self.store.insert_notification(&notification) {
            Ok(()) => outcome.recorded = true,
            Err(e) => warn!(space_id = %request.space_id, error = %e, "Failed to record notification"),
        }

        let slot = match self.limiter.try_claim(&request.recipient, &request.space_id) {
            Ok(Some(slot)) => slot,
            Ok(None) => {
                metrics::notification_email("suppressed");
                outcome.suppressed = true;
                return outcome;
            }
            Err(e) => {
                warn!(space_id = %request.space_id, error = %e, "Rate limiter unavailable, skipping email");
                metrics::notification_email("skipped");
                return outcome;
            }
        };

        let template = match request.kind {
            NotificationKind::Mention => MailTemplate::Mention,
            NotificationKind::ChatMessage => MailTemplate::ChatMessage,
        };

        match self
            .mailer
            .send(&request.recipient, template, notification.payload.clone())
            .await
        {
            Ok(()) => {
                metrics::notification_email("sent");
                outcome.emailed = true;
                debug!(space_id = %request.space_id, kind = %request.kind, "Notification email sent");
            }
            Err(e) => {
                metrics::notification_email("failed");
                warn!(space_id = %request.space_id, error = %e, "Notification email failed");
                if let Err(e) = self.limiter.release(&slot) {
                    warn!(space_id = %request.space_id, error = %e, "Failed to release email slot");
                }
            }
        }

        if outcome.emailed && outcome.recorded {
            if let Err(e) = self.store.mark_notification_emailed(&notification.id) {
                warn!(space_id = %request.space_id, error = %e, "Failed to flag notification as emailed");
            }
        }

        outcome
    }
}
