//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. No operation spans more than
//! one collection; callers that write to several collections accept
//! that a crash in between can lose the later write.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SumbongResult;
use crate::models::{
    complaint::{
        Complaint, ComplaintFilter, ComplaintStatus, CreateComplaint, FeedbackEntry,
        UpdateComplaint,
    },
    notification::{CreateNotification, Notification},
    user::{
        CreateUser, IssueToken, TokenConsumption, TokenPurpose, UpdateUser, User,
        VerificationDecision,
    },
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the (normalized) email is taken.
    fn create(&self, input: CreateUser) -> impl Future<Output = SumbongResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SumbongResult<User>> + Send;
    /// Case-insensitive.
    fn get_by_email(&self, email: &str) -> impl Future<Output = SumbongResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = SumbongResult<User>> + Send;
    /// Replace the password hash and stamp `password_changed_at`.
    fn set_password(
        &self,
        id: Uuid,
        password_hash: String,
    ) -> impl Future<Output = SumbongResult<User>> + Send;
    /// Hard delete.
    fn delete(&self, id: Uuid) -> impl Future<Output = SumbongResult<()>> + Send;

    /// Residents only; admin accounts are never listed.
    fn list_residents(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = SumbongResult<PaginatedResult<User>>> + Send;
    fn list_admins(&self) -> impl Future<Output = SumbongResult<Vec<User>>> + Send;
    /// Residents whose credentials have been reviewed at least once
    /// (status other than pending), most recent decision first.
    fn list_verification_history(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = SumbongResult<PaginatedResult<User>>> + Send;

    // -- single-use tokens --------------------------------------------------

    /// Store a token hash in the addressed slot, replacing any previous
    /// one.
    fn issue_token(
        &self,
        id: Uuid,
        input: IssueToken,
    ) -> impl Future<Output = SumbongResult<()>> + Send;
    /// Find the holder of a live (unexpired) token. `NotFound` covers
    /// both unknown and expired tokens.
    fn find_by_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = SumbongResult<User>> + Send;
    /// Clear the slot and apply `consumption` in one conditional update
    /// that only matches while the same live hash is still stored. A
    /// second consumption of the same token returns `NotFound`.
    fn consume_token(
        &self,
        id: Uuid,
        token_hash: &str,
        consumption: TokenConsumption,
        now: DateTime<Utc>,
    ) -> impl Future<Output = SumbongResult<User>> + Send;

    // -- credential verification ---------------------------------------------

    fn apply_verification(
        &self,
        id: Uuid,
        decision: VerificationDecision,
    ) -> impl Future<Output = SumbongResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Complaints
// ---------------------------------------------------------------------------

pub trait ComplaintRepository: Send + Sync {
    fn create(
        &self,
        input: CreateComplaint,
    ) -> impl Future<Output = SumbongResult<Complaint>> + Send;
    /// Returns soft-deleted complaints too; callers decide visibility.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SumbongResult<Complaint>> + Send;
    fn list(
        &self,
        filter: ComplaintFilter,
        pagination: Pagination,
    ) -> impl Future<Output = SumbongResult<PaginatedResult<Complaint>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateComplaint,
    ) -> impl Future<Output = SumbongResult<Complaint>> + Send;
    fn set_status(
        &self,
        id: Uuid,
        status: ComplaintStatus,
    ) -> impl Future<Output = SumbongResult<Complaint>> + Send;
    /// Append one entry to the feedback thread in a single store
    /// operation. Existing entries are never rewritten.
    fn append_feedback(
        &self,
        id: Uuid,
        entry: FeedbackEntry,
    ) -> impl Future<Output = SumbongResult<Complaint>> + Send;
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = SumbongResult<()>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = SumbongResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub trait NotificationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateNotification,
    ) -> impl Future<Output = SumbongResult<Notification>> + Send;
    /// Newest first.
    fn list_for_recipient(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        pagination: Pagination,
    ) -> impl Future<Output = SumbongResult<PaginatedResult<Notification>>> + Send;
    fn count_unread(&self, recipient_id: Uuid) -> impl Future<Output = SumbongResult<u64>> + Send;
    fn mark_read(
        &self,
        recipient_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SumbongResult<Notification>> + Send;
    /// Returns how many notifications changed.
    fn mark_all_read(&self, recipient_id: Uuid) -> impl Future<Output = SumbongResult<u64>> + Send;
    fn delete(&self, recipient_id: Uuid, id: Uuid)
    -> impl Future<Output = SumbongResult<()>> + Send;
}
