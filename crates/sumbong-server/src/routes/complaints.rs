//! `/api/complaints`: filing, listing, editing, status changes,
//! deletion and the feedback thread.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use sumbong_core::error::SumbongError;
use sumbong_core::models::complaint::{
    Complaint, ComplaintStatus, CreateComplaint, EvidenceFile, UpdateComplaint,
};
use uuid::Uuid;

use super::done;
use crate::dto::{PageQuery, nullable, page};
use crate::error::ApiResult;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", post(create).get(list_all))
        .route("/mine", get(list_mine))
        .route("/history", get(history))
        .route(
            "/{id}",
            get(get_complaint).put(update_details).delete(delete_complaint),
        )
        .route("/{id}/status", put(update_status))
        .route("/{id}/feedback", post(post_feedback))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Evidence {
    url: String,
    storage_id: String,
    #[serde(default)]
    content_type: Option<String>,
}

impl From<Evidence> for EvidenceFile {
    fn from(e: Evidence) -> Self {
        EvidenceFile {
            url: e.url,
            storage_id: e.storage_id,
            content_type: e.content_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateComplaintRequest {
    #[serde(default)]
    anonymous: bool,
    #[serde(default)]
    confidential: bool,
    incident_date: String,
    #[serde(default)]
    incident_time: String,
    location: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    people_involved: String,
    description: String,
    #[serde(default)]
    requested_resolution: String,
    complaint_type: String,
    #[serde(default)]
    evidence: Vec<Evidence>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateComplaintRequest {
    #[serde(default)]
    anonymous: Option<bool>,
    #[serde(default)]
    confidential: Option<bool>,
    #[serde(default)]
    incident_date: Option<String>,
    #[serde(default)]
    incident_time: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    longitude: Option<Option<f64>>,
    #[serde(default)]
    people_involved: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    requested_resolution: Option<String>,
    #[serde(default)]
    complaint_type: Option<String>,
    #[serde(default)]
    evidence: Option<Vec<Evidence>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRequest {
    status: ComplaintStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackRequest {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminListQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    limit: Option<u64>,
}

fn complaint_body(complaint: Complaint) -> Json<Value> {
    Json(json!({ "success": true, "complaint": complaint }))
}

async fn create(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiJson(req): ApiJson<CreateComplaintRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let complaint = state
        .complaints
        .create(
            &principal,
            CreateComplaint {
                // Replaced with the caller's id by the service.
                reporter_id: principal.user_id(),
                anonymous: req.anonymous,
                confidential: req.confidential,
                incident_date: req.incident_date,
                incident_time: req.incident_time,
                location: req.location,
                latitude: req.latitude,
                longitude: req.longitude,
                people_involved: req.people_involved,
                description: req.description,
                requested_resolution: req.requested_resolution,
                complaint_type: req.complaint_type,
                evidence: req.evidence.into_iter().map(EvidenceFile::from).collect(),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, complaint_body(complaint)))
}

async fn list_mine(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Value>> {
    let result = state
        .complaints
        .list_mine(&principal, query.pagination())
        .await?;
    Ok(Json(page(result, |c| c)))
}

async fn history(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Value>> {
    let result = state
        .complaints
        .history(&principal, query.pagination())
        .await?;
    Ok(Json(page(result, |c| c)))
}

async fn list_all(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<AdminListQuery>,
) -> ApiResult<Json<Value>> {
    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(ComplaintStatus::parse(raw).ok_or_else(|| {
            SumbongError::validation(format!("unknown complaint status: {raw}"))
        })?),
    };
    let pagination = PageQuery {
        offset: query.offset,
        limit: query.limit,
    }
    .pagination();

    let result = state
        .complaints
        .list_all(&admin, status, pagination)
        .await?;
    Ok(Json(page(result, |c| c)))
}

async fn get_complaint(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    Ok(complaint_body(state.complaints.get(&principal, id).await?))
}

async fn update_details(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateComplaintRequest>,
) -> ApiResult<Json<Value>> {
    let complaint = state
        .complaints
        .update_details(
            &principal,
            id,
            UpdateComplaint {
                anonymous: req.anonymous,
                confidential: req.confidential,
                incident_date: req.incident_date,
                incident_time: req.incident_time,
                location: req.location,
                latitude: req.latitude,
                longitude: req.longitude,
                people_involved: req.people_involved,
                description: req.description,
                requested_resolution: req.requested_resolution,
                complaint_type: req.complaint_type,
                evidence: req
                    .evidence
                    .map(|files| files.into_iter().map(EvidenceFile::from).collect()),
            },
        )
        .await?;
    Ok(complaint_body(complaint))
}

async fn update_status(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let complaint = state
        .complaints
        .update_status(&admin, id, req.status)
        .await?;
    Ok(complaint_body(complaint))
}

async fn delete_complaint(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state.complaints.delete(&principal, id).await?;
    Ok(done("Complaint deleted."))
}

async fn post_feedback(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> ApiResult<Json<Value>> {
    let complaint = state
        .feedback
        .post_entry(&principal, id, &req.message)
        .await?;
    Ok(complaint_body(complaint))
}
