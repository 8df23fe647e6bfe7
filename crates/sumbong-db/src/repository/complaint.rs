//! SurrealDB implementation of [`ComplaintRepository`].

use chrono::{DateTime, Utc};
use sumbong_core::error::SumbongResult;
use sumbong_core::models::complaint::{
    Complaint, ComplaintFilter, ComplaintStatus, CreateComplaint, FeedbackEntry, UpdateComplaint,
};
use sumbong_core::repository::{ComplaintRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, from_json, parse_uuid, to_json};

const SELECT_COMPLAINT: &str = "SELECT meta::id(id) AS record_id, * FROM";

#[derive(Debug, SurrealValue)]
struct ComplaintRow {
    record_id: String,
    reporter_id: String,
    anonymous: bool,
    confidential: bool,
    incident_date: String,
    incident_time: String,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    people_involved: String,
    description: String,
    requested_resolution: String,
    complaint_type: String,
    evidence: serde_json::Value,
    status: String,
    feedback: Option<String>,
    feedback_entries: serde_json::Value,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

impl ComplaintRow {
    fn try_into_complaint(self) -> Result<Complaint, DbError> {
        let status = ComplaintStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown complaint status: {}", self.status)))?;

        Ok(Complaint {
            id: parse_uuid("complaint", &self.record_id)?,
            reporter_id: parse_uuid("reporter", &self.reporter_id)?,
            anonymous: self.anonymous,
            confidential: self.confidential,
            incident_date: self.incident_date,
            incident_time: self.incident_time,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            people_involved: self.people_involved,
            description: self.description,
            requested_resolution: self.requested_resolution,
            complaint_type: self.complaint_type,
            evidence: from_json("evidence", self.evidence)?,
            status,
            feedback: self.feedback,
            feedback_entries: from_json("feedback_entries", self.feedback_entries)?,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_complaint(rows: Vec<ComplaintRow>, id: String) -> Result<Complaint, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "complaint".into(),
            id,
        })?
        .try_into_complaint()
}

/// SurrealDB implementation of the Complaint repository.
#[derive(Clone)]
pub struct SurrealComplaintRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealComplaintRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn write_then_read(
        &self,
        id: Uuid,
        statement: &str,
        bind: impl FnOnce(
            surrealdb::method::Query<'_, C>,
        ) -> surrealdb::method::Query<'_, C>,
    ) -> Result<Complaint, DbError> {
        let id_str = id.to_string();
        let query = format!("{statement}; {SELECT_COMPLAINT} type::record('complaint', $id);");

        let builder = self.db.query(query).bind(("id", id_str.clone()));
        let result = bind(builder).await?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let written: Vec<surrealdb_types::Value> = result.take(0)?;
        if written.is_empty() {
            return Err(DbError::NotFound {
                entity: "complaint".into(),
                id: id_str,
            });
        }

        let rows: Vec<ComplaintRow> = result.take(1)?;
        first_complaint(rows, id_str)
    }
}

impl<C: Connection> ComplaintRepository for SurrealComplaintRepository<C> {
    async fn create(&self, input: CreateComplaint) -> SumbongResult<Complaint> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let evidence = to_json("evidence", &input.evidence)?;

        let result = self
            .db
            .query(format!(
                "CREATE type::record('complaint', $id) SET \
                 reporter_id = $reporter_id, anonymous = $anonymous, \
                 confidential = $confidential, \
                 incident_date = $incident_date, incident_time = $incident_time, \
                 location = $location, latitude = $latitude, \
                 longitude = $longitude, people_involved = $people_involved, \
                 description = $description, \
                 requested_resolution = $requested_resolution, \
                 complaint_type = $complaint_type, evidence = $evidence, \
                 status = 'pending', feedback_entries = []; \
                 {SELECT_COMPLAINT} type::record('complaint', $id);"
            ))
            .bind(("id", id_str.clone()))
            .bind(("reporter_id", input.reporter_id.to_string()))
            .bind(("anonymous", input.anonymous))
            .bind(("confidential", input.confidential))
            .bind(("incident_date", input.incident_date))
            .bind(("incident_time", input.incident_time))
            .bind(("location", input.location))
            .bind(("latitude", input.latitude))
            .bind(("longitude", input.longitude))
            .bind(("people_involved", input.people_involved))
            .bind(("description", input.description))
            .bind(("requested_resolution", input.requested_resolution))
            .bind(("complaint_type", input.complaint_type))
            .bind(("evidence", evidence))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ComplaintRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_complaint(rows, id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> SumbongResult<Complaint> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!("{SELECT_COMPLAINT} type::record('complaint', $id)"))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ComplaintRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_complaint(rows, id_str)?)
    }

    async fn list(
        &self,
        filter: ComplaintFilter,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<Complaint>> {
        let mut conditions = vec![if filter.deleted {
            "deleted_at != NONE"
        } else {
            "deleted_at = NONE"
        }];
        if filter.reporter_id.is_some() {
            conditions.push("reporter_id = $reporter_id");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let where_clause = conditions.join(" AND ");

        let mut builder = self
            .db
            .query(format!(
                "SELECT count() AS total FROM complaint WHERE {where_clause} GROUP ALL; \
                 {SELECT_COMPLAINT} complaint WHERE {where_clause} \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));

        if let Some(reporter_id) = filter.reporter_id {
            builder = builder.bind(("reporter_id", reporter_id.to_string()));
        }
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<ComplaintRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ComplaintRow::try_into_complaint)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn update(&self, id: Uuid, input: UpdateComplaint) -> SumbongResult<Complaint> {
        let evidence = input
            .evidence
            .as_ref()
            .map(|files| to_json("evidence", files))
            .transpose()?;

        let mut sets = Vec::new();
        if input.anonymous.is_some() {
            sets.push("anonymous = $anonymous");
        }
        if input.confidential.is_some() {
            sets.push("confidential = $confidential");
        }
        if input.incident_date.is_some() {
            sets.push("incident_date = $incident_date");
        }
        if input.incident_time.is_some() {
            sets.push("incident_time = $incident_time");
        }
        if input.location.is_some() {
            sets.push("location = $location");
        }
        if input.latitude.is_some() {
            sets.push("latitude = $latitude");
        }
        if input.longitude.is_some() {
            sets.push("longitude = $longitude");
        }
        if input.people_involved.is_some() {
            sets.push("people_involved = $people_involved");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.requested_resolution.is_some() {
            sets.push("requested_resolution = $requested_resolution");
        }
        if input.complaint_type.is_some() {
            sets.push("complaint_type = $complaint_type");
        }
        if evidence.is_some() {
            sets.push("evidence = $evidence");
        }
        sets.push("updated_at = time::now()");

        let statement = format!(
            "UPDATE type::record('complaint', $id) SET {} WHERE status != NONE",
            sets.join(", ")
        );

        let complaint = self
            .write_then_read(id, &statement, |mut builder| {
                if let Some(anonymous) = input.anonymous {
                    builder = builder.bind(("anonymous", anonymous));
                }
                if let Some(confidential) = input.confidential {
                    builder = builder.bind(("confidential", confidential));
                }
                if let Some(incident_date) = input.incident_date {
                    builder = builder.bind(("incident_date", incident_date));
                }
                if let Some(incident_time) = input.incident_time {
                    builder = builder.bind(("incident_time", incident_time));
                }
                if let Some(location) = input.location {
                    builder = builder.bind(("location", location));
                }
                if let Some(latitude) = input.latitude {
                    builder = builder.bind(("latitude", latitude));
                }
                if let Some(longitude) = input.longitude {
                    builder = builder.bind(("longitude", longitude));
                }
                if let Some(people_involved) = input.people_involved {
                    builder = builder.bind(("people_involved", people_involved));
                }
                if let Some(description) = input.description {
                    builder = builder.bind(("description", description));
                }
                if let Some(requested_resolution) = input.requested_resolution {
                    builder = builder.bind(("requested_resolution", requested_resolution));
                }
                if let Some(complaint_type) = input.complaint_type {
                    builder = builder.bind(("complaint_type", complaint_type));
                }
                if let Some(evidence) = evidence {
                    builder = builder.bind(("evidence", evidence));
                }
                builder
            })
            .await?;

        Ok(complaint)
    }

    async fn set_status(&self, id: Uuid, status: ComplaintStatus) -> SumbongResult<Complaint> {
        let complaint = self
            .write_then_read(
                id,
                "UPDATE type::record('complaint', $id) SET status = $status, \
                 updated_at = time::now() WHERE status != NONE",
                |builder| builder.bind(("status", status.as_str().to_string())),
            )
            .await?;

        Ok(complaint)
    }

    async fn append_feedback(&self, id: Uuid, entry: FeedbackEntry) -> SumbongResult<Complaint> {
        let entry = to_json("feedback entry", &entry)?;

        let complaint = self
            .write_then_read(
                id,
                "UPDATE type::record('complaint', $id) SET \
                 feedback_entries += $entry, updated_at = time::now() \
                 WHERE status != NONE",
                |builder| builder.bind(("entry", entry)),
            )
            .await?;

        Ok(complaint)
    }

    async fn soft_delete(&self, id: Uuid) -> SumbongResult<()> {
        self.write_then_read(
            id,
            "UPDATE type::record('complaint', $id) SET \
             deleted_at = time::now(), updated_at = time::now() \
             WHERE deleted_at = NONE",
            |builder| builder,
        )
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> SumbongResult<()> {
        self.db
            .query("DELETE type::record('complaint', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
