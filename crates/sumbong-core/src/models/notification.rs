//! Admin-facing notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewUser,
    NewComplaint,
    UserFeedback,
    CredentialResubmitted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewUser => "new_user",
            Self::NewComplaint => "new_complaint",
            Self::UserFeedback => "user_feedback",
            Self::CredentialResubmitted => "credential_resubmitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_user" => Some(Self::NewUser),
            "new_complaint" => Some(Self::NewComplaint),
            "user_feedback" => Some(Self::UserFeedback),
            "credential_resubmitted" => Some(Self::CredentialResubmitted),
            _ => None,
        }
    }
}

/// Polymorphic reference to the entity a notification is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "entity_type", content = "entity_id", rename_all = "snake_case")]
pub enum EntityRef {
    User(Uuid),
    Complaint(Uuid),
}

impl EntityRef {
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Complaint(_) => "complaint",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::User(id) | Self::Complaint(id) => *id,
        }
    }

    pub fn from_parts(entity_type: &str, id: Uuid) -> Option<Self> {
        match entity_type {
            "user" => Some(Self::User(id)),
            "complaint" => Some(Self::Complaint(id)),
            _ => None,
        }
    }
}

/// Append-only record: after creation only `read` changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    #[serde(flatten)]
    pub entity: EntityRef,
    pub message: String,
    pub meta: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub entity: EntityRef,
    pub message: String,
    pub meta: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_serializes_as_type_and_id() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(EntityRef::Complaint(id)).unwrap();
        assert_eq!(json["entity_type"], "complaint");
        assert_eq!(json["entity_id"], id.to_string());
    }

    #[test]
    fn kind_strings_match_parse() {
        for kind in [
            NotificationKind::NewUser,
            NotificationKind::NewComplaint,
            NotificationKind::UserFeedback,
            NotificationKind::CredentialResubmitted,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
    }
}
