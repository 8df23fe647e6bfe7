//! User domain model.
//!
//! Residents and administrators share one record type, discriminated
//! by [`Role`]. Admin-only operations elsewhere in the workspace take an
//! admin principal rather than inspecting this flag directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Resident,
    Admin,
}

/// Admin-reviewed approval state of a resident's uploaded credentials.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
    ResubmissionRequired,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ResubmissionRequired => "resubmission_required",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "resubmission_required" => Some(Self::ResubmissionRequired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Password,
    Google,
}

/// A resident-uploaded document (ID, certificate) proving residency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialFile {
    pub url: String,
    /// Identifier assigned by the document storage service.
    pub storage_id: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PolicyAcceptance {
    pub accepted_terms: bool,
    pub accepted_privacy: bool,
    pub version: String,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationState {
    pub status: VerificationStatus,
    /// Mirrors `status == Approved`; gates login.
    pub approved: bool,
    pub admin_notes: Option<String>,
    pub issue_details: Option<String>,
    pub required_actions: Option<String>,
    pub rejection_count: u32,
    pub verification_date: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub resubmission_requested: bool,
    pub resubmission_reason: Option<String>,
    /// Informational only; nothing expires a request automatically.
    pub resubmission_deadline: Option<DateTime<Utc>>,
    pub resubmission_requested_at: Option<DateTime<Utc>>,
}

impl Default for VerificationState {
    fn default() -> Self {
        Self {
            status: VerificationStatus::Pending,
            approved: false,
            admin_notes: None,
            issue_details: None,
            required_actions: None,
            rejection_count: 0,
            verification_date: None,
            verified_by: None,
            resubmission_requested: false,
            resubmission_reason: None,
            resubmission_deadline: None,
            resubmission_requested_at: None,
        }
    }
}

/// Which single-use token slot on the user record is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
    PasswordChange,
}

/// A stored single-use token: SHA-256 of the raw value plus expiry.
/// The raw value is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSlot {
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub auth_provider: AuthProvider,
    pub credentials: Vec<CredentialFile>,
    pub verification: VerificationState,
    pub email_verified: bool,
    #[serde(skip_serializing, default)]
    pub email_verification: Option<TokenSlot>,
    #[serde(skip_serializing, default)]
    pub password_reset: Option<TokenSlot>,
    #[serde(skip_serializing, default)]
    pub password_change: Option<TokenSlot>,
    /// New password hash awaiting confirmation through the
    /// password-change token.
    #[serde(skip_serializing, default)]
    pub pending_password_hash: Option<String>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub policy: PolicyAcceptance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Normalized (trimmed, lower-cased) by the repository.
    pub email: String,
    /// Argon2id PHC string; hashing happens in the auth layer.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub auth_provider: AuthProvider,
    pub credentials: Vec<CredentialFile>,
    pub email_verified: bool,
    pub policy: PolicyAcceptance,
}

/// Self-service profile edits.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// `Some(Some(url))` = set, `Some(None)` = clear, `None` = no change.
    pub avatar_url: Option<Option<String>>,
}

/// Issue a token into one of the user's single-use slots, replacing
/// whatever was there.
#[derive(Debug, Clone)]
pub struct IssueToken {
    pub purpose: TokenPurpose,
    pub slot: TokenSlot,
    /// Only meaningful for [`TokenPurpose::PasswordChange`].
    pub pending_password_hash: Option<String>,
}

/// The state change applied when a single-use token is consumed. The
/// consumed slot is implied by the variant.
#[derive(Debug, Clone)]
pub enum TokenConsumption {
    VerifyEmail,
    ResetPassword { password_hash: String },
    ApplyPendingPassword,
}

impl TokenConsumption {
    pub fn purpose(&self) -> TokenPurpose {
        match self {
            Self::VerifyEmail => TokenPurpose::EmailVerification,
            Self::ResetPassword { .. } => TokenPurpose::PasswordReset,
            Self::ApplyPendingPassword => TokenPurpose::PasswordChange,
        }
    }
}

/// An admin decision over a user's credential-approval state. Each
/// variant is applied to the store as a single update.
#[derive(Debug, Clone)]
pub enum VerificationDecision {
    Approve {
        admin_id: Uuid,
        admin_notes: Option<String>,
    },
    Reject {
        admin_id: Uuid,
        issue_details: String,
        required_actions: String,
        admin_notes: Option<String>,
    },
    RequestResubmission {
        admin_id: Uuid,
        reason: String,
        deadline: DateTime<Utc>,
        admin_notes: Option<String>,
    },
    /// The resident uploaded new credentials; review starts over.
    /// Applies only while the account is not approved.
    Resubmitted { files: Vec<CredentialFile> },
    /// Plain approve/disapprove toggle from the user-management table.
    SetApproval { admin_id: Uuid, approved: bool },
}
