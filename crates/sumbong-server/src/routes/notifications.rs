//! `/api/notifications`: the admin inbox.

use axum::extract::State;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::done;
use crate::dto::{PageQuery, page};
use crate::error::ApiResult;
use crate::extract::{AdminUser, ApiPath, ApiQuery};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/{id}/read", put(mark_read))
        .route("/{id}", delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InboxQuery {
    #[serde(default)]
    unread_only: bool,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    limit: Option<u64>,
}

async fn list(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<InboxQuery>,
) -> ApiResult<Json<Value>> {
    let pagination = PageQuery {
        offset: query.offset,
        limit: query.limit,
    }
    .pagination();
    let result = state
        .notices
        .list(&admin, query.unread_only, pagination)
        .await?;
    Ok(Json(page(result, |n| n)))
}

async fn unread_count(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let count = state.notices.unread_count(&admin).await?;
    Ok(Json(json!({ "success": true, "count": count })))
}

async fn mark_read(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let notification = state.notices.mark_read(&admin, id).await?;
    Ok(Json(json!({ "success": true, "notification": notification })))
}

async fn mark_all_read(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let updated = state.notices.mark_all_read(&admin).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

async fn remove(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state.notices.delete(&admin, id).await?;
    Ok(done("Notification deleted."))
}
