//! `/api/users`: own profile, credential resubmission, and the admin
//! user-management and credential-review endpoints.

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sumbong_core::error::SumbongError;
use sumbong_core::models::user::{UpdateUser, User};
use sumbong_workflow::{RejectInput, ResubmissionInput};
use uuid::Uuid;

use super::done;
use crate::dto::{PageQuery, UploadedFile, UserView, credentials, nullable, page};
use crate::error::ApiResult;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list))
        .route("/me", get(me).put(update_me))
        .route("/me/credentials", post(resubmit_credentials))
        .route("/verification-history", get(verification_history))
        .route("/{id}", get(get_user).delete(delete_user))
        .route("/{id}/approve", put(approve))
        .route("/{id}/disapprove", put(disapprove))
        .route("/{id}/approve-credentials", post(approve_credentials))
        .route("/{id}/reject-credentials", post(reject_credentials))
        .route("/{id}/request-resubmission", post(request_resubmission))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMeRequest {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    avatar_url: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsRequest {
    credentials: Vec<UploadedFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveRequest {
    #[serde(default)]
    admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectRequest {
    issue_details: String,
    #[serde(default)]
    required_actions: Option<String>,
    #[serde(default)]
    admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResubmissionRequest {
    reason: String,
    #[serde(default)]
    deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    admin_notes: Option<String>,
}

fn user_body(user: User) -> Json<Value> {
    Json(json!({ "success": true, "user": UserView::from(user) }))
}

async fn me(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
) -> ApiResult<Json<Value>> {
    Ok(user_body(state.users.me(principal.user_id()).await?))
}

async fn update_me(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiJson(req): ApiJson<UpdateMeRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .users
        .update_me(
            principal.user_id(),
            UpdateUser {
                first_name: req.first_name,
                last_name: req.last_name,
                phone: req.phone,
                address: req.address,
                avatar_url: req.avatar_url,
            },
        )
        .await?;
    Ok(user_body(user))
}

async fn resubmit_credentials(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> ApiResult<Json<Value>> {
    if principal.is_admin() {
        return Err(SumbongError::denied("admin accounts have no credentials to review").into());
    }
    let user = state
        .verification
        .resubmit_credentials(principal.user_id(), credentials(req.credentials)?)
        .await?;
    Ok(user_body(user))
}

async fn list(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Value>> {
    let result = state
        .users
        .list_residents(&admin, query.pagination())
        .await?;
    Ok(Json(page(result, UserView::from)))
}

async fn verification_history(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Value>> {
    let result = state
        .verification
        .history(&admin, query.pagination())
        .await?;
    Ok(Json(page(result, UserView::from)))
}

async fn get_user(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    Ok(user_body(state.users.get(&admin, id).await?))
}

async fn delete_user(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state.users.delete(&admin, id).await?;
    Ok(done("User deleted."))
}

async fn approve(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    Ok(user_body(state.verification.set_approval(&admin, id, true).await?))
}

async fn disapprove(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    Ok(user_body(state.verification.set_approval(&admin, id, false).await?))
}

async fn approve_credentials(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ApproveRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .verification
        .approve(&admin, id, req.admin_notes)
        .await?;
    Ok(user_body(user))
}

async fn reject_credentials(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RejectRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .verification
        .reject(
            &admin,
            id,
            RejectInput {
                issue_details: req.issue_details,
                required_actions: req.required_actions,
                admin_notes: req.admin_notes,
            },
        )
        .await?;
    Ok(user_body(user))
}

async fn request_resubmission(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ResubmissionRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .verification
        .request_resubmission(
            &admin,
            id,
            ResubmissionInput {
                reason: req.reason,
                deadline: req.deadline,
                admin_notes: req.admin_notes,
            },
        )
        .await?;
    Ok(user_body(user))
}
