//! Database-specific error types and conversions.

use sumbong_core::error::SumbongError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    Duplicate { entity: String },
}

impl From<DbError> for SumbongError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SumbongError::NotFound { entity, id },
            DbError::Duplicate { entity } => SumbongError::AlreadyExists { entity },
            other => SumbongError::Database(other.to_string()),
        }
    }
}

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    field: &str,
    value: serde_json::Value,
) -> Result<T, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::Decode(format!("invalid {field}: {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(field: &str, value: &T) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(value).map_err(|e| DbError::Decode(format!("cannot encode {field}: {e}")))
}
