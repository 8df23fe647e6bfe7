//! Events pushed to connected clients over the realtime channel.
//!
//! Delivery is at-most-once. Every event describes a change that is
//! also observable through the REST API, so a client that missed one
//! recovers by re-fetching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::complaint::{ComplaintStatus, FeedbackEntry};
use crate::models::notification::Notification;
use crate::models::user::VerificationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    Connected {
        user_id: Uuid,
    },
    Ping {
        at: DateTime<Utc>,
    },
    StatusUpdate {
        complaint_id: Uuid,
        status: ComplaintStatus,
    },
    /// Carries only the newly appended entry, never the whole thread.
    FeedbackThreadUpdate {
        complaint_id: Uuid,
        entry: FeedbackEntry,
    },
    CredentialVerification {
        status: VerificationStatus,
        message: String,
        admin_notes: Option<String>,
        issue_details: Option<String>,
        required_actions: Option<String>,
    },
    CredentialResubmission {
        reason: String,
        deadline: DateTime<Utc>,
    },
    AdminNotification {
        notification: Notification,
    },
}

impl RealtimeEvent {
    /// The `type` tag, also used as the SSE `event:` name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Ping { .. } => "ping",
            Self::StatusUpdate { .. } => "status_update",
            Self::FeedbackThreadUpdate { .. } => "feedback_thread_update",
            Self::CredentialVerification { .. } => "credential_verification",
            Self::CredentialResubmission { .. } => "credential_resubmission",
            Self::AdminNotification { .. } => "admin_notification",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::complaint::AuthorType;

    #[test]
    fn type_tag_matches_kind() {
        let event = RealtimeEvent::FeedbackThreadUpdate {
            complaint_id: Uuid::new_v4(),
            entry: FeedbackEntry {
                message: "Noted, we will follow up.".into(),
                author_type: AuthorType::Admin,
                created_at: Utc::now(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["entry"]["author_type"], "admin");
    }

    #[test]
    fn status_update_uses_display_status() {
        let event = RealtimeEvent::StatusUpdate {
            complaint_id: Uuid::new_v4(),
            status: ComplaintStatus::InProgress,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_update");
        assert_eq!(json["status"], "in progress");
    }
}
