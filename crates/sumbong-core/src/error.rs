//! Error types for the Sumbong system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SumbongError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// Failed authentication. `code` is a stable machine-readable
    /// identifier returned to clients alongside `reason`.
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { code: &'static str, reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A third-party collaborator (email API, identity provider) failed.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SumbongError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }
}

pub type SumbongResult<T> = Result<T, SumbongError>;
