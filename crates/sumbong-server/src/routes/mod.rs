//! HTTP routes.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::state::SharedState;

pub mod auth;
pub mod complaints;
pub mod notifications;
pub mod realtime;
pub mod users;

pub fn api(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth::routes())
        .nest("/api/users", users::routes())
        .nest("/api/complaints", complaints::routes())
        .nest("/api/notifications", notifications::routes())
        .route("/api/realtime", get(realtime::stream))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

/// `{ success: true, message }`.
fn done(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}
