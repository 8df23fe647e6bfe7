//! Complaint lifecycle: filing, listing, editing, status changes and
//! deletion.

use sumbong_auth::{AdminPrincipal, Principal};
use sumbong_core::error::{SumbongError, SumbongResult};
use sumbong_core::events::RealtimeEvent;
use sumbong_core::models::complaint::{
    Complaint, ComplaintFilter, ComplaintStatus, CreateComplaint, UpdateComplaint,
};
use sumbong_core::models::notification::{EntityRef, NotificationKind};
use sumbong_core::notifier::EventPublisher;
use sumbong_core::repository::{
    ComplaintRepository, NotificationRepository, PaginatedResult, Pagination, UserRepository,
};
use sumbong_core::validation::required;
use tracing::info;
use uuid::Uuid;

use crate::notification::NotificationService;

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> SumbongResult<()> {
    if latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(SumbongError::validation("latitude must be between -90 and 90"));
    }
    if longitude.is_some_and(|lng| !(-180.0..=180.0).contains(&lng)) {
        return Err(SumbongError::validation(
            "longitude must be between -180 and 180",
        ));
    }
    Ok(())
}

fn required_if_set(field: &str, value: Option<String>) -> SumbongResult<Option<String>> {
    value.map(|v| required(field, &v)).transpose()
}

pub struct ComplaintService<C, U, N, P> {
    complaints: C,
    notices: NotificationService<U, N, P>,
}

impl<C, U, N, P> ComplaintService<C, U, N, P>
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

    /// Load a complaint the actor may see. Residents only see their own
    /// live complaints.
    async fn visible(&self, actor: &Principal, id: Uuid) -> SumbongResult<Complaint> {
        let complaint = self.complaints.get_by_id(id).await?;
        match actor {
            Principal::Admin(_) => Ok(complaint),
            Principal::Resident(user_id)
                if complaint.reporter_id == *user_id && !complaint.is_deleted() =>
            {
                Ok(complaint)
            }
            Principal::Resident(_) => Err(SumbongError::not_found("complaint", id)),
        }
    }

    /// File a complaint as the calling resident.
    pub async fn create(
        &self,
        actor: &Principal,
        mut input: CreateComplaint,
    ) -> SumbongResult<Complaint> {
        let Principal::Resident(reporter_id) = actor else {
            return Err(SumbongError::denied("only residents can file complaints"));
        };
        input.reporter_id = *reporter_id;
        input.incident_date = required("incident date", &input.incident_date)?;
        input.location = required("location", &input.location)?;
        input.description = required("description", &input.description)?;
        input.complaint_type = required("complaint type", &input.complaint_type)?;
        check_coordinates(input.latitude, input.longitude)?;

        let complaint = self.complaints.create(input).await?;
        info!(complaint_id = %complaint.id, reporter_id = %reporter_id, "complaint filed");

        self.notices
            .notify_admins(
                NotificationKind::NewComplaint,
                EntityRef::Complaint(complaint.id),
                format!("New {} complaint filed", complaint.complaint_type),
                Some(serde_json::json!({
                    "complaint_type": complaint.complaint_type,
                    "location": complaint.location,
                    "anonymous": complaint.anonymous,
                })),
            )
            .await;

        Ok(complaint)
    }

    pub async fn list_mine(
        &self,
        actor: &Principal,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<Complaint>> {
        self.complaints
            .list(
                ComplaintFilter {
                    reporter_id: Some(actor.user_id()),
                    ..Default::default()
                },
                pagination,
            )
            .await
    }

    pub async fn list_all(
        &self,
        _admin: &AdminPrincipal,
        status: Option<ComplaintStatus>,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<Complaint>> {
        self.complaints
            .list(
                ComplaintFilter {
                    status,
                    ..Default::default()
                },
                pagination,
            )
            .await
    }

    /// Soft-deleted complaints: the caller's own, or all for admins.
    pub async fn history(
        &self,
        actor: &Principal,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<Complaint>> {
        let reporter_id = match actor {
            Principal::Resident(id) => Some(*id),
            Principal::Admin(_) => None,
        };
        self.complaints
            .list(
                ComplaintFilter {
                    reporter_id,
                    status: None,
                    deleted: true,
                },
                pagination,
            )
            .await
    }

    pub async fn get(&self, actor: &Principal, id: Uuid) -> SumbongResult<Complaint> {
        self.visible(actor, id).await
    }

    /// Reporter edits, allowed until the complaint is solved.
    pub async fn update_details(
        &self,
        actor: &Principal,
        id: Uuid,
        mut input: UpdateComplaint,
    ) -> SumbongResult<Complaint> {
        let complaint = self.visible(actor, id).await?;
        if actor.is_admin() {
            return Err(SumbongError::denied(
                "complaint details can only be edited by the reporter",
            ));
        }
        if complaint.status == ComplaintStatus::Solved {
            return Err(SumbongError::validation(
                "solved complaints can no longer be edited",
            ));
        }

        input.incident_date = required_if_set("incident date", input.incident_date)?;
        input.location = required_if_set("location", input.location)?;
        input.description = required_if_set("description", input.description)?;
        input.complaint_type = required_if_set("complaint type", input.complaint_type)?;
        check_coordinates(
            input.latitude.unwrap_or(complaint.latitude),
            input.longitude.unwrap_or(complaint.longitude),
        )?;

        self.complaints.update(id, input).await
    }

    /// Change status and tell the reporter.
    pub async fn update_status(
        &self,
        admin: &AdminPrincipal,
        id: Uuid,
        status: ComplaintStatus,
    ) -> SumbongResult<Complaint> {
        let complaint = self.complaints.set_status(id, status).await?;
        info!(
            complaint_id = %id,
            admin_id = %admin.id(),
            status = status.as_str(),
            "complaint status changed"
        );

        self.notices.publisher().publish(
            complaint.reporter_id,
            RealtimeEvent::StatusUpdate {
                complaint_id: id,
                status,
            },
        );
        Ok(complaint)
    }

    /// Residents soft-delete their own complaints (kept for history);
    /// admins delete permanently.
    pub async fn delete(&self, actor: &Principal, id: Uuid) -> SumbongResult<()> {
        self.visible(actor, id).await?;
        match actor {
            Principal::Resident(_) => self.complaints.soft_delete(id).await?,
            Principal::Admin(admin) => {
                self.complaints.delete(id).await?;
                info!(complaint_id = %id, admin_id = %admin.id(), "complaint deleted");
            }
        }
        Ok(())
    }
}
