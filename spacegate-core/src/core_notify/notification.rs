//! In-app notification records

use crate::core_space::{EmailAddress, SpaceId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Mention,
    ChatMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Mention => "mention",
            NotificationKind::ChatMessage => "chat_message",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mention" => Ok(NotificationKind::Mention),
            "chat_message" => Ok(NotificationKind::ChatMessage),
            other => Err(format!("unknown notification kind: {}", other)),
        }
    }
}

/// A request to notify one recipient about activity in a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub space_id: SpaceId,
    pub recipient: EmailAddress,
    pub kind: NotificationKind,
    /// Display name of whoever mentioned or messaged the recipient
    pub actor: String,
    /// Short preview of the message
    pub excerpt: String,
}

/// Stored notification, written whether or not an email goes out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub id: Uuid,
    pub space_id: SpaceId,
    pub recipient: EmailAddress,
    pub kind: NotificationKind,
    pub actor: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    /// An email was sent for this notification
    pub emailed: bool,
}

impl InAppNotification {
    pub fn from_request(request: &NotificationRequest, now: Timestamp) -> Self {
        InAppNotification {
            id: Uuid::new_v4(),
            space_id: request.space_id,
            recipient: request.recipient.clone(),
            kind: request.kind,
            actor: request.actor.clone(),
            payload: serde_json::json!({
                "actor": request.actor,
                "excerpt": request.excerpt,
            }),
            created_at: now,
            emailed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [NotificationKind::Mention, NotificationKind::ChatMessage] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("digest".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn test_from_request() {
        let request = NotificationRequest {
            space_id: SpaceId::generate(),
            recipient: EmailAddress::parse("a@x.com").unwrap(),
            kind: NotificationKind::Mention,
            actor: "Dana".to_string(),
            excerpt: "@a can you review?".to_string(),
        };

        let notification = InAppNotification::from_request(&request, Timestamp::from_millis(7));
        assert!(!notification.emailed);
        assert_eq!(notification.payload["excerpt"], "@a can you review?");
        assert_eq!(notification.created_at, Timestamp::from_millis(7));
    }
}
