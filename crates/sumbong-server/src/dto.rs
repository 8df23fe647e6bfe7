//! Wire types shared by several route modules.
//!
//! Request types reject unknown fields; responses are explicit views
//! over the domain models.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use sumbong_core::error::SumbongResult;
use sumbong_core::models::user::{CredentialFile, User};
use sumbong_core::repository::{PaginatedResult, Pagination};
use sumbong_core::validation::required;

const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            offset: self.offset.unwrap_or(defaults.offset),
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// `{ success, items, total, offset, limit }`.
pub fn page<T, V: Serialize>(result: PaginatedResult<T>, view: impl Fn(T) -> V) -> Value {
    let items: Vec<V> = result.items.into_iter().map(view).collect();
    json!({
        "success": true,
        "items": items,
        "total": result.total,
        "offset": result.offset,
        "limit": result.limit,
    })
}

/// An account as the client sees it. Secrets never leave the server.
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    user: User,
    is_admin: bool,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            is_admin: user.is_admin(),
            user,
        }
    }
}

/// A file already stored by the upload service.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadedFile {
    pub url: String,
    pub storage_id: String,
}

impl UploadedFile {
    pub fn into_credential(self) -> SumbongResult<CredentialFile> {
        Ok(CredentialFile {
            url: required("credential url", &self.url)?,
            storage_id: required("credential storage id", &self.storage_id)?,
            uploaded_at: Utc::now(),
        })
    }
}

pub fn credentials(files: Vec<UploadedFile>) -> SumbongResult<Vec<CredentialFile>> {
    files.into_iter().map(UploadedFile::into_credential).collect()
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
