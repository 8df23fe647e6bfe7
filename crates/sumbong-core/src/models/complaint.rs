//! Complaint domain model and its feedback thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComplaintStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "solved")]
    Solved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Solved => "solved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in progress" => Some(Self::InProgress),
            "solved" => Some(Self::Solved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorType {
    User,
    Admin,
}

/// One message in a complaint's feedback thread. Entries are only ever
/// appended; none is edited or removed after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    pub message: String,
    pub author_type: AuthorType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceFile {
    pub url: String,
    pub storage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    pub reporter_id: Uuid,
    /// Display-only: ownership is tracked regardless.
    pub anonymous: bool,
    pub confidential: bool,
    pub incident_date: String,
    pub incident_time: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub people_involved: String,
    pub description: String,
    pub requested_resolution: String,
    pub complaint_type: String,
    pub evidence: Vec<EvidenceFile>,
    pub status: ComplaintStatus,
    /// Deprecated single free-text admin reply kept for old records.
    pub feedback: Option<String>,
    pub feedback_entries: Vec<FeedbackEntry>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComplaint {
    pub reporter_id: Uuid,
    pub anonymous: bool,
    pub confidential: bool,
    pub incident_date: String,
    pub incident_time: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub people_involved: String,
    pub description: String,
    pub requested_resolution: String,
    pub complaint_type: String,
    pub evidence: Vec<EvidenceFile>,
}

/// Reporter edits; status is changed separately by admins.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateComplaint {
    pub anonymous: Option<bool>,
    pub confidential: Option<bool>,
    pub incident_date: Option<String>,
    pub incident_time: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub people_involved: Option<String>,
    pub description: Option<String>,
    pub requested_resolution: Option<String>,
    pub complaint_type: Option<String>,
    pub evidence: Option<Vec<EvidenceFile>>,
}

/// Which complaints a list query returns.
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub reporter_id: Option<Uuid>,
    pub status: Option<ComplaintStatus>,
    /// `false` = live complaints only, `true` = soft-deleted only.
    pub deleted: bool,
}
