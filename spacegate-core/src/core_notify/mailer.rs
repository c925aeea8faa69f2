//! Outbound email contract
//!
//! Delivery is best-effort everywhere it is used: callers log and swallow
//! [`MailError`] so a failed email never fails the triggering action.

use crate::core_space::EmailAddress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Email templates this crate sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTemplate {
    MagicLink,
    Mention,
    ChatMessage,
}

impl MailTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailTemplate::MagicLink => "magic_link",
            MailTemplate::Mention => "mention",
            MailTemplate::ChatMessage => "chat_message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("Mail transport unavailable: {0}")]
    Unavailable(String),

    #[error("Recipient rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &EmailAddress,
        template: MailTemplate,
        payload: serde_json::Value,
    ) -> Result<(), MailError>;
}

/// Writes emails to the log instead of sending them. Development use.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        to: &EmailAddress,
        template: MailTemplate,
        payload: serde_json::Value,
    ) -> Result<(), MailError> {
        // Payloads can carry live magic links; only the shape is logged
        let fields: Vec<&str> = payload
            .as_object()
            .map(|object| object.keys().map(String::as_str).collect())
            .unwrap_or_default();

        info!(template = template.as_str(), fields = ?fields, "Email logged instead of sent");
        debug!(to = %to, "LogMailer recipient");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let mailer = LogMailer;
        let to = EmailAddress::parse("a@x.com").unwrap();
        assert!(mailer
            .send(&to, MailTemplate::MagicLink, serde_json::json!({ "link": "https://x" }))
            .await
            .is_ok());
    }

    #[test]
    fn test_template_names() {
        assert_eq!(MailTemplate::MagicLink.as_str(), "magic_link");
        assert_eq!(
            serde_json::to_string(&MailTemplate::ChatMessage).unwrap(),
            "\"chat_message\""
        );
    }
}
