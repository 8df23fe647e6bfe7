//! HTTP error mapping.
//!
//! Every failure leaves the server as `{ "success": false, "message",
//! "code" }`. Server-side details (database, crypto, upstream) are
//! logged here and replaced with a generic message.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sumbong_auth::AuthError;
use sumbong_core::error::SumbongError;
use sumbong_db::DbError;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] SumbongError),

    /// The request never reached a handler: malformed JSON, unknown
    /// fields, a bad path segment.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

fn status_and_code(err: &SumbongError) -> (StatusCode, &'static str) {
    match err {
        SumbongError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        SumbongError::AlreadyExists { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        SumbongError::AuthenticationFailed { code, .. } => (StatusCode::UNAUTHORIZED, *code),
        SumbongError::AuthorizationDenied { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        SumbongError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        SumbongError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        SumbongError::Database(_) | SumbongError::Crypto(_) | SumbongError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Rejected { status, message } => (status, "INVALID_REQUEST", message),
            ApiError::Domain(err) => {
                let (status, code) = status_and_code(&err);
                let message = match &err {
                    SumbongError::AuthenticationFailed { reason, .. } => reason.clone(),
                    SumbongError::AuthorizationDenied { reason } => reason.clone(),
                    SumbongError::Validation { message } => message.clone(),
                    SumbongError::AlreadyExists { entity } => format!("{entity} already exists"),
                    SumbongError::NotFound { entity, .. } => format!("{entity} not found"),
                    SumbongError::Upstream(detail) => {
                        warn!(error = %detail, "upstream failure");
                        "An external service is unavailable, please try again later".into()
                    }
                    other => {
                        error!(error = %other, "request failed");
                        "Internal server error".into()
                    }
                };
                (status, code, message)
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "code": code,
        }));
        (status, body).into_response()
    }
}

/// A failed call to the email API or the identity provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} responded with status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned an unreadable response: {reason}")]
    Malformed { service: &'static str, reason: String },
}

impl From<UpstreamError> for SumbongError {
    fn from(err: UpstreamError) -> Self {
        SumbongError::Upstream(err.to_string())
    }
}

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database connection failed: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] DbError),

    #[error("service setup failed: {0}")]
    Service(#[from] SumbongError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
