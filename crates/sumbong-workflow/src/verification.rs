//! Admin review of resident credentials.
//!
//! Transitions: `pending → approved`, `pending → rejected`,
//! `pending ⇄ resubmission_required`; a resident's own upload moves
//! `rejected | resubmission_required → pending`. Each decision is a
//! single store update; the resident is then told by push (if
//! connected) and email.
//! Resubmission deadlines are recorded for display only.

use chrono::{DateTime, Duration, Utc};
use sumbong_auth::AdminPrincipal;
use sumbong_core::error::{SumbongError, SumbongResult};
use sumbong_core::events::RealtimeEvent;
use sumbong_core::models::notification::{EntityRef, NotificationKind};
use sumbong_core::models::user::{CredentialFile, User, VerificationDecision};
use sumbong_core::notifier::{EventPublisher, Mailer, OutgoingEmail};
use sumbong_core::repository::{
    NotificationRepository, PaginatedResult, Pagination, UserRepository,
};
use sumbong_core::validation::optional_text;
use tracing::{info, warn};
use uuid::Uuid;

use crate::mail;
use crate::notification::NotificationService;

pub const DEFAULT_REQUIRED_ACTIONS: &str = "Please upload clear, valid proof of residency.";
pub const DEFAULT_RESUBMISSION_DAYS: i64 = 7;

#[derive(Debug, Clone, Default)]
pub struct RejectInput {
    pub issue_details: String,
    pub required_actions: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResubmissionInput {
    pub reason: String,
    pub deadline: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

pub struct VerificationService<U, N, M, P> {
    users: U,
    mailer: M,
    notices: NotificationService<U, N, P>,
}

impl<U, N, M, P> VerificationService<U, N, M, P>
where
    U: UserRepository,
    N: NotificationRepository,
    M: Mailer,
    P: EventPublisher,
{
    pub fn new(users: U, mailer: M, notices: NotificationService<U, N, P>) -> Self {
        Self {
            users,
            mailer,
            notices,
        }
    }

    async fn deliver(&self, email: OutgoingEmail) {
        let to = email.to.clone();
        if let Err(e) = self.mailer.send(email).await {
            warn!(error = %e, to = %to, "failed to send verification email");
        }
    }

    fn push_decision(&self, user: &User, message: &str) {
        let v = &user.verification;
        self.notices.publisher().publish(
            user.id,
            RealtimeEvent::CredentialVerification {
                status: v.status,
                message: message.to_string(),
                admin_notes: v.admin_notes.clone(),
                issue_details: v.issue_details.clone(),
                required_actions: v.required_actions.clone(),
            },
        );
    }

    pub async fn approve(
        &self,
        admin: &AdminPrincipal,
        user_id: Uuid,
        admin_notes: Option<String>,
    ) -> SumbongResult<User> {
        let admin_notes = optional_text(admin_notes);
        let user = self
            .users
            .apply_verification(
                user_id,
                VerificationDecision::Approve {
                    admin_id: admin.id(),
                    admin_notes: admin_notes.clone(),
                },
            )
            .await?;

        info!(user_id = %user_id, admin_id = %admin.id(), "credentials approved");

        self.push_decision(&user, "Your credentials have been approved.");
        self.deliver(mail::credentials_approved(&user, admin_notes.as_deref()))
            .await;
        Ok(user)
    }

    /// Reject with mandatory issue details. The rejection counter is
    /// incremented by the store, so concurrent rejections never lose a
    /// count.
    pub async fn reject(
        &self,
        admin: &AdminPrincipal,
        user_id: Uuid,
        input: RejectInput,
    ) -> SumbongResult<User> {
        let Some(issue_details) = optional_text(Some(input.issue_details)) else {
            return Err(SumbongError::validation(
                "issue details are required when rejecting credentials",
            ));
        };
        let required_actions = optional_text(input.required_actions)
            .unwrap_or_else(|| DEFAULT_REQUIRED_ACTIONS.to_string());
        let admin_notes = optional_text(input.admin_notes);

        let user = self
            .users
            .apply_verification(
                user_id,
                VerificationDecision::Reject {
                    admin_id: admin.id(),
                    issue_details: issue_details.clone(),
                    required_actions: required_actions.clone(),
                    admin_notes: admin_notes.clone(),
                },
            )
            .await?;

        info!(
            user_id = %user_id,
            admin_id = %admin.id(),
            rejection_count = user.verification.rejection_count,
            "credentials rejected"
        );

        self.push_decision(&user, "Your credentials were not accepted.");
        self.deliver(mail::credentials_rejected(
            &user,
            &issue_details,
            &required_actions,
            admin_notes.as_deref(),
        ))
        .await;
        Ok(user)
    }

    pub async fn request_resubmission(
        &self,
        admin: &AdminPrincipal,
        user_id: Uuid,
        input: ResubmissionInput,
    ) -> SumbongResult<User> {
        let Some(reason) = optional_text(Some(input.reason)) else {
            return Err(SumbongError::validation(
                "a reason is required when requesting resubmission",
            ));
        };
        let deadline = input
            .deadline
            .unwrap_or_else(|| Utc::now() + Duration::days(DEFAULT_RESUBMISSION_DAYS));
        let admin_notes = optional_text(input.admin_notes);

        let user = self
            .users
            .apply_verification(
                user_id,
                VerificationDecision::RequestResubmission {
                    admin_id: admin.id(),
                    reason: reason.clone(),
                    deadline,
                    admin_notes: admin_notes.clone(),
                },
            )
            .await?;

        info!(user_id = %user_id, admin_id = %admin.id(), "credential resubmission requested");

        self.notices.publisher().publish(
            user.id,
            RealtimeEvent::CredentialResubmission {
                reason: reason.clone(),
                deadline,
            },
        );
        self.deliver(mail::resubmission_requested(
            &user,
            &reason,
            deadline,
            admin_notes.as_deref(),
        ))
        .await;
        Ok(user)
    }

    /// Plain approve/disapprove toggle. Disapproving puts the account
    /// back to `pending`.
    pub async fn set_approval(
        &self,
        admin: &AdminPrincipal,
        user_id: Uuid,
        approved: bool,
    ) -> SumbongResult<User> {
        let user = self
            .users
            .apply_verification(
                user_id,
                VerificationDecision::SetApproval {
                    admin_id: admin.id(),
                    approved,
                },
            )
            .await?;

        info!(user_id = %user_id, admin_id = %admin.id(), approved, "approval toggled");

        let message = if approved {
            "Your account has been approved."
        } else {
            "Your account approval has been withdrawn."
        };
        self.push_decision(&user, message);
        Ok(user)
    }

    /// Residents whose credentials have been reviewed at least once.
    pub async fn history(
        &self,
        _admin: &AdminPrincipal,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<User>> {
        self.users.list_verification_history(pagination).await
    }

    /// A resident uploads new credentials; review starts over and the
    /// admins are notified. Approved accounts keep their approval and
    /// get a validation error.
    pub async fn resubmit_credentials(
        &self,
        user_id: Uuid,
        files: Vec<CredentialFile>,
    ) -> SumbongResult<User> {
        if files.is_empty() {
            return Err(SumbongError::validation(
                "at least one credential file is required",
            ));
        }

        let user = match self
            .users
            .apply_verification(user_id, VerificationDecision::Resubmitted { files })
            .await
        {
            Ok(user) => user,
            Err(SumbongError::NotFound { .. }) => {
                // The guarded update matched nothing; tell an approved
                // account apart from a missing one.
                let current = self.users.get_by_id(user_id).await?;
                if current.is_admin() {
                    return Err(SumbongError::not_found("user", user_id));
                }
                return Err(SumbongError::validation(format!(
                    "credentials cannot be resubmitted while the account is {}",
                    current.verification.status.as_str()
                )));
            }
            Err(e) => return Err(e),
        };

        info!(user_id = %user_id, "credentials resubmitted");

        self.notices
            .notify_admins(
                NotificationKind::CredentialResubmitted,
                EntityRef::User(user.id),
                format!("{} resubmitted their credentials", user.full_name()),
                Some(serde_json::json!({ "email": user.email })),
            )
            .await;
        Ok(user)
    }
}
