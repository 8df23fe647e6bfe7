//! The per-complaint feedback thread between a reporter and the admins.
//!
//! Entries are only ever appended. After the append is stored, the new
//! entry alone is pushed to the other party; when that party is the
//! admin team, each admin also gets a durable notification.

use chrono::Utc;
use sumbong_auth::Principal;
use sumbong_core::error::{SumbongError, SumbongResult};
use sumbong_core::events::RealtimeEvent;
use sumbong_core::models::complaint::{AuthorType, Complaint, FeedbackEntry};
use sumbong_core::models::notification::{EntityRef, NotificationKind};
use sumbong_core::notifier::EventPublisher;
use sumbong_core::repository::{ComplaintRepository, NotificationRepository, UserRepository};
use tracing::info;
use uuid::Uuid;

use crate::notification::NotificationService;

pub const MAX_MESSAGE_CHARS: usize = 2000;

const PREVIEW_CHARS: usize = 120;

pub struct FeedbackService<C, U, N, P> {
    complaints: C,
    notices: NotificationService<U, N, P>,
}

impl<C, U, N, P> FeedbackService<C, U, N, P>
where
    C: ComplaintRepository,
    U: UserRepository,
    N: NotificationRepository,
    P: EventPublisher,
{
    pub fn new(complaints: C, notices: NotificationService<U, N, P>) -> Self {
        Self {
            complaints,
            notices,
        }
    }

    /// Append `message` to the thread of `complaint_id` as `actor`.
    ///
    /// Residents may post only on their own live complaints; admins on
    /// any complaint.
    pub async fn post_entry(
        &self,
        actor: &Principal,
        complaint_id: Uuid,
        message: &str,
    ) -> SumbongResult<Complaint> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SumbongError::validation("message must not be empty"));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(SumbongError::validation(format!(
                "message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let complaint = self.complaints.get_by_id(complaint_id).await?;
        let author_type = match actor {
            Principal::Resident(user_id) => {
                if complaint.is_deleted() {
                    return Err(SumbongError::not_found("complaint", complaint_id));
                }
                if complaint.reporter_id != *user_id {
                    return Err(SumbongError::denied(
                        "only the reporter can reply on this complaint",
                    ));
                }
                AuthorType::User
            }
            Principal::Admin(_) => AuthorType::Admin,
        };

        let entry = FeedbackEntry {
            message: message.to_string(),
            author_type,
            created_at: Utc::now(),
        };
        let updated = self
            .complaints
            .append_feedback(complaint_id, entry.clone())
            .await?;

        info!(
            complaint_id = %complaint_id,
            author = ?author_type,
            entries = updated.feedback_entries.len(),
            "feedback entry appended"
        );

        match author_type {
            AuthorType::Admin => {
                self.notices.publisher().publish(
                    updated.reporter_id,
                    RealtimeEvent::FeedbackThreadUpdate {
                        complaint_id,
                        entry,
                    },
                );
            }
            AuthorType::User => {
                for admin_id in self.notices.admin_ids().await {
                    self.notices.publisher().publish(
                        admin_id,
                        RealtimeEvent::FeedbackThreadUpdate {
                            complaint_id,
                            entry: entry.clone(),
                        },
                    );
                }
                let preview: String = entry.message.chars().take(PREVIEW_CHARS).collect();
                self.notices
                    .notify_admins(
                        NotificationKind::UserFeedback,
                        EntityRef::Complaint(complaint_id),
                        format!("New reply on a {} complaint", updated.complaint_type),
                        Some(serde_json::json!({ "preview": preview })),
                    )
                    .await;
            }
        }

        Ok(updated)
    }
}
