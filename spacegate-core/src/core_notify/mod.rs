//! Notifications for mentions and chat messages
//!
//! - [`NotificationDispatcher`]: writes the in-app record and sends a
//!   best-effort email
//! - [`NotificationRateLimiter`]: one email per recipient and space per window
//! - [`Mailer`]: outbound email contract

pub mod dispatcher;
pub mod mailer;
pub mod notification;
pub mod rate_limiter;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher};
pub use mailer::{LogMailer, MailError, MailTemplate, Mailer};
pub use notification::{InAppNotification, NotificationKind, NotificationRequest};
pub use rate_limiter::{EmailSlot, NotificationRateLimiter};
