//! Admin notifications: durable records plus a live push.

use sumbong_auth::AdminPrincipal;
use sumbong_core::error::SumbongResult;
use sumbong_core::events::RealtimeEvent;
use sumbong_core::models::notification::{
    CreateNotification, EntityRef, Notification, NotificationKind,
};
use sumbong_core::notifier::EventPublisher;
use sumbong_core::repository::{
    NotificationRepository, PaginatedResult, Pagination, UserRepository,
};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct NotificationService<U, N, P> {
    users: U,
    notifications: N,
    publisher: P,
}

impl<U, N, P> NotificationService<U, N, P>
where
    U: UserRepository,
    N: NotificationRepository,
    P: EventPublisher,
{
    pub fn new(users: U, notifications: N, publisher: P) -> Self {
        Self {
            users,
            notifications,
            publisher,
        }
    }

    pub(crate) fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Admin ids for fan-out. A failed lookup yields nobody.
    pub(crate) async fn admin_ids(&self) -> Vec<Uuid> {
        match self.users.list_admins().await {
            Ok(admins) => admins.into_iter().map(|a| a.id).collect(),
            Err(e) => {
                warn!(error = %e, "failed to list admins for fan-out");
                Vec::new()
            }
        }
    }

    /// Write one notification per admin and push each to its owner.
    /// Returns how many records were written; failures are logged.
    pub async fn notify_admins(
        &self,
        kind: NotificationKind,
        entity: EntityRef,
        message: impl Into<String>,
        meta: Option<serde_json::Value>,
    ) -> usize {
        let message = message.into();
        let mut written = 0;

        for admin_id in self.admin_ids().await {
            let created = self
                .notifications
                .create(CreateNotification {
                    recipient_id: admin_id,
                    kind,
                    entity,
                    message: message.clone(),
                    meta: meta.clone(),
                })
                .await;

            match created {
                Ok(notification) => {
                    written += 1;
                    self.publisher
                        .publish(admin_id, RealtimeEvent::AdminNotification { notification });
                }
                Err(e) => {
                    warn!(error = %e, admin_id = %admin_id, kind = kind.as_str(), "failed to write notification");
                }
            }
        }

        debug!(kind = kind.as_str(), written, "admins notified");
        written
    }

    pub async fn list(
        &self,
        admin: &AdminPrincipal,
        unread_only: bool,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<Notification>> {
        self.notifications
            .list_for_recipient(admin.id(), unread_only, pagination)
            .await
    }

    pub async fn unread_count(&self, admin: &AdminPrincipal) -> SumbongResult<u64> {
        self.notifications.count_unread(admin.id()).await
    }

    pub async fn mark_read(&self, admin: &AdminPrincipal, id: Uuid) -> SumbongResult<Notification> {
        self.notifications.mark_read(admin.id(), id).await
    }

    pub async fn mark_all_read(&self, admin: &AdminPrincipal) -> SumbongResult<u64> {
        self.notifications.mark_all_read(admin.id()).await
    }

    pub async fn delete(&self, admin: &AdminPrincipal, id: Uuid) -> SumbongResult<()> {
        self.notifications.delete(admin.id(), id).await
    }
}
