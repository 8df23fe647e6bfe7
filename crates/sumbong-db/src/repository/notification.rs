//! SurrealDB implementation of [`NotificationRepository`].
//!
//! Every query is scoped to the recipient, so one admin can never read
//! or mark another admin's notifications.

use chrono::{DateTime, Utc};
use sumbong_core::error::SumbongResult;
use sumbong_core::models::notification::{
    CreateNotification, EntityRef, Notification, NotificationKind,
};
use sumbong_core::repository::{NotificationRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

const SELECT_NOTIFICATION: &str = "SELECT meta::id(id) AS record_id, * FROM";

#[derive(Debug, SurrealValue)]
struct NotificationRow {
    record_id: String,
    recipient_id: String,
    kind: String,
    entity_type: String,
    entity_id: String,
    message: String,
    meta: serde_json::Value,
    read: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

impl NotificationRow {
    fn try_into_notification(self) -> Result<Notification, DbError> {
        let kind = NotificationKind::parse(&self.kind)
            .ok_or_else(|| DbError::Decode(format!("unknown notification kind: {}", self.kind)))?;
        let entity_id = parse_uuid("entity", &self.entity_id)?;
        let entity = EntityRef::from_parts(&self.entity_type, entity_id).ok_or_else(|| {
            DbError::Decode(format!("unknown entity type: {}", self.entity_type))
        })?;

        Ok(Notification {
            id: parse_uuid("notification", &self.record_id)?,
            recipient_id: parse_uuid("recipient", &self.recipient_id)?,
            kind,
            entity,
            message: self.message,
            meta: self.meta,
            read: self.read,
            created_at: self.created_at,
        })
    }
}

fn first_notification(rows: Vec<NotificationRow>, id: String) -> Result<Notification, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "notification".into(),
            id,
        })?
        .try_into_notification()
}

/// SurrealDB implementation of the Notification repository.
#[derive(Clone)]
pub struct SurrealNotificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealNotificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> NotificationRepository for SurrealNotificationRepository<C> {
    async fn create(&self, input: CreateNotification) -> SumbongResult<Notification> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let meta = input
            .meta
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(format!(
                "CREATE type::record('notification', $id) SET \
                 recipient_id = $recipient_id, kind = $kind, \
                 entity_type = $entity_type, entity_id = $entity_id, \
                 message = $message, meta = $meta, read = false; \
                 {SELECT_NOTIFICATION} type::record('notification', $id);"
            ))
            .bind(("id", id_str.clone()))
            .bind(("recipient_id", input.recipient_id.to_string()))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("entity_type", input.entity.entity_type().to_string()))
            .bind(("entity_id", input.entity.id().to_string()))
            .bind(("message", input.message))
            .bind(("meta", meta))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<NotificationRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_notification(rows, id_str)?)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<Notification>> {
        let where_clause = if unread_only {
            "recipient_id = $recipient_id AND read = false"
        } else {
            "recipient_id = $recipient_id"
        };

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM notification WHERE {where_clause} GROUP ALL; \
                 {SELECT_NOTIFICATION} notification WHERE {where_clause} \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("recipient_id", recipient_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<NotificationRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(NotificationRow::try_into_notification)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_unread(&self, recipient_id: Uuid) -> SumbongResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM notification \
                 WHERE recipient_id = $recipient_id AND read = false GROUP ALL",
            )
            .bind(("recipient_id", recipient_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn mark_read(&self, recipient_id: Uuid, id: Uuid) -> SumbongResult<Notification> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(format!(
                "UPDATE type::record('notification', $id) SET read = true \
                 WHERE recipient_id = $recipient_id; \
                 {SELECT_NOTIFICATION} type::record('notification', $id) \
                 WHERE recipient_id = $recipient_id;"
            ))
            .bind(("id", id_str.clone()))
            .bind(("recipient_id", recipient_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<NotificationRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_notification(rows, id_str)?)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> SumbongResult<u64> {
        let result = self
            .db
            .query(
                "UPDATE notification SET read = true \
                 WHERE recipient_id = $recipient_id AND read = false",
            )
            .bind(("recipient_id", recipient_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let updated: Vec<surrealdb_types::Value> = result.take(0).map_err(DbError::from)?;
        Ok(updated.len() as u64)
    }

    async fn delete(&self, recipient_id: Uuid, id: Uuid) -> SumbongResult<()> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "DELETE type::record('notification', $id) \
                 WHERE recipient_id = $recipient_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("recipient_id", recipient_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let deleted: Vec<surrealdb_types::Value> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::NotFound {
                entity: "notification".into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }
}
