//! SurrealDB implementation of [`UserRepository`].
//!
//! Writes are followed by a read of the same record in one query
//! round-trip so callers always get the stored state back. Token
//! consumption and verification decisions are single conditional
//! `UPDATE` statements; the row count tells whether they matched.

use chrono::{DateTime, Utc};
use sumbong_core::error::SumbongResult;
use sumbong_core::models::user::{
    AuthProvider, CreateUser, IssueToken, PolicyAcceptance, Role, TokenConsumption, TokenPurpose,
    TokenSlot, UpdateUser, User, VerificationDecision, VerificationState, VerificationStatus,
};
use sumbong_core::repository::{PaginatedResult, Pagination, UserRepository};
use sumbong_core::validation::normalize_email;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, from_json, parse_uuid, to_json};

const SELECT_USER: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// DB-side row struct; always selected with `meta::id(id) AS record_id`.
#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: String,
    address: String,
    avatar_url: Option<String>,
    role: String,
    auth_provider: String,
    credentials: serde_json::Value,
    verification_status: String,
    approved: bool,
    admin_notes: Option<String>,
    issue_details: Option<String>,
    required_actions: Option<String>,
    rejection_count: u32,
    verification_date: Option<DateTime<Utc>>,
    verified_by: Option<String>,
    resubmission_requested: bool,
    resubmission_reason: Option<String>,
    resubmission_deadline: Option<DateTime<Utc>>,
    resubmission_requested_at: Option<DateTime<Utc>>,
    email_verified: bool,
    email_verification_hash: Option<String>,
    email_verification_expires: Option<DateTime<Utc>>,
    password_reset_hash: Option<String>,
    password_reset_expires: Option<DateTime<Utc>>,
    password_change_hash: Option<String>,
    password_change_expires: Option<DateTime<Utc>>,
    pending_password_hash: Option<String>,
    password_changed_at: Option<DateTime<Utc>>,
    accepted_terms: bool,
    accepted_privacy: bool,
    policy_version: String,
    policy_accepted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    match s {
        "resident" => Ok(Role::Resident),
        "admin" => Ok(Role::Admin),
        other => Err(DbError::Decode(format!("unknown role: {other}"))),
    }
}

fn role_to_string(r: Role) -> &'static str {
    match r {
        Role::Resident => "resident",
        Role::Admin => "admin",
    }
}

fn parse_provider(s: &str) -> Result<AuthProvider, DbError> {
    match s {
        "password" => Ok(AuthProvider::Password),
        "google" => Ok(AuthProvider::Google),
        other => Err(DbError::Decode(format!("unknown auth provider: {other}"))),
    }
}

fn provider_to_string(p: AuthProvider) -> &'static str {
    match p {
        AuthProvider::Password => "password",
        AuthProvider::Google => "google",
    }
}

/// Column names of the hash and expiry for a token slot.
fn token_columns(purpose: TokenPurpose) -> (&'static str, &'static str) {
    match purpose {
        TokenPurpose::EmailVerification => {
            ("email_verification_hash", "email_verification_expires")
        }
        TokenPurpose::PasswordReset => ("password_reset_hash", "password_reset_expires"),
        TokenPurpose::PasswordChange => ("password_change_hash", "password_change_expires"),
    }
}

fn slot(hash: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<TokenSlot> {
    match (hash, expires_at) {
        (Some(hash), Some(expires_at)) => Some(TokenSlot { hash, expires_at }),
        _ => None,
    }
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let status = VerificationStatus::parse(&self.verification_status).ok_or_else(|| {
            DbError::Decode(format!(
                "unknown verification status: {}",
                self.verification_status
            ))
        })?;
        let verified_by = self
            .verified_by
            .as_deref()
            .map(|raw| parse_uuid("verified_by", raw))
            .transpose()?;

        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            address: self.address,
            avatar_url: self.avatar_url,
            role: parse_role(&self.role)?,
            auth_provider: parse_provider(&self.auth_provider)?,
            credentials: from_json("credentials", self.credentials)?,
            verification: VerificationState {
                status,
                approved: self.approved,
                admin_notes: self.admin_notes,
                issue_details: self.issue_details,
                required_actions: self.required_actions,
                rejection_count: self.rejection_count,
                verification_date: self.verification_date,
                verified_by,
                resubmission_requested: self.resubmission_requested,
                resubmission_reason: self.resubmission_reason,
                resubmission_deadline: self.resubmission_deadline,
                resubmission_requested_at: self.resubmission_requested_at,
            },
            email_verified: self.email_verified,
            email_verification: slot(
                self.email_verification_hash,
                self.email_verification_expires,
            ),
            password_reset: slot(self.password_reset_hash, self.password_reset_expires),
            password_change: slot(self.password_change_hash, self.password_change_expires),
            pending_password_hash: self.pending_password_hash,
            password_changed_at: self.password_changed_at,
            policy: PolicyAcceptance {
                accepted_terms: self.accepted_terms,
                accepted_privacy: self.accepted_privacy,
                version: self.policy_version,
                accepted_at: self.policy_accepted_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_user(rows: Vec<UserRow>, id: impl Into<String>) -> Result<User, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.into(),
        })?
        .try_into_user()
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Run a write statement against one user record, then read the
    /// record back. `NotFound` when the write matched nothing.
    async fn write_then_read(
        &self,
        id: Uuid,
        statement: String,
        bind: impl FnOnce(
            surrealdb::method::Query<'_, C>,
        ) -> surrealdb::method::Query<'_, C>,
    ) -> Result<User, DbError> {
        let id_str = id.to_string();
        let query = format!("{statement}; {SELECT_USER} type::record('user', $id);");

        let builder = self.db.query(query).bind(("id", id_str.clone()));
        let result = bind(builder).await?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let written: Vec<surrealdb_types::Value> = result.take(0)?;
        if written.is_empty() {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: id_str,
            });
        }

        let rows: Vec<UserRow> = result.take(1)?;
        first_user(rows, id_str)
    }

    async fn count(&self, filter: &str) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM user WHERE {filter} GROUP ALL"
            ))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn page(
        &self,
        filter: &str,
        order: &str,
        pagination: Pagination,
    ) -> Result<PaginatedResult<User>, DbError> {
        let total = self.count(filter).await?;

        let mut result = self
            .db
            .query(format!(
                "{SELECT_USER} user WHERE {filter} ORDER BY {order} \
                 LIMIT $limit START $offset"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        let items = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> SumbongResult<User> {
        let email = normalize_email(&input.email);

        match self.get_by_email(&email).await {
            Ok(_) => {
                return Err(DbError::Duplicate {
                    entity: "user".into(),
                }
                .into());
            }
            Err(sumbong_core::SumbongError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let credentials = to_json("credentials", &input.credentials)?;

        let result = self
            .db
            .query(format!(
                "CREATE type::record('user', $id) SET \
                 email = $email, password_hash = $password_hash, \
                 first_name = $first_name, last_name = $last_name, \
                 phone = $phone, address = $address, \
                 avatar_url = $avatar_url, role = $role, \
                 auth_provider = $auth_provider, \
                 credentials = $credentials, \
                 verification_status = 'pending', approved = false, \
                 rejection_count = 0, resubmission_requested = false, \
                 email_verified = $email_verified, \
                 accepted_terms = $accepted_terms, \
                 accepted_privacy = $accepted_privacy, \
                 policy_version = $policy_version, \
                 policy_accepted_at = $policy_accepted_at; \
                 {SELECT_USER} type::record('user', $id);"
            ))
            .bind(("id", id_str.clone()))
            .bind(("email", email))
            .bind(("password_hash", input.password_hash))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("phone", input.phone))
            .bind(("address", input.address))
            .bind(("avatar_url", input.avatar_url))
            .bind(("role", role_to_string(input.role).to_string()))
            .bind((
                "auth_provider",
                provider_to_string(input.auth_provider).to_string(),
            ))
            .bind(("credentials", credentials))
            .bind(("email_verified", input.email_verified))
            .bind(("accepted_terms", input.policy.accepted_terms))
            .bind(("accepted_privacy", input.policy.accepted_privacy))
            .bind(("policy_version", input.policy.version))
            .bind(("policy_accepted_at", input.policy.accepted_at))
            .await
            .map_err(DbError::from)?;

        // The unique index still guards a concurrent signup racing past
        // the lookup above.
        let mut result = result.check().map_err(|e| {
            let msg = e.to_string();
            if msg.contains("idx_user_email") {
                DbError::Duplicate {
                    entity: "user".into(),
                }
            } else {
                DbError::Query(msg)
            }
        })?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_user(rows, id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> SumbongResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!("{SELECT_USER} type::record('user', $id)"))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_user(rows, id_str)?)
    }

    async fn get_by_email(&self, email: &str) -> SumbongResult<User> {
        let email = normalize_email(email);

        let mut result = self
            .db
            .query(format!("{SELECT_USER} user WHERE email = $email LIMIT 1"))
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_user(rows, format!("email={email}"))?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> SumbongResult<User> {
        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.address.is_some() {
            sets.push("address = $address");
        }
        if input.avatar_url.is_some() {
            sets.push("avatar_url = $avatar_url");
        }
        sets.push("updated_at = time::now()");

        let statement = format!(
            "UPDATE type::record('user', $id) SET {} WHERE role != NONE",
            sets.join(", ")
        );

        let user = self
            .write_then_read(id, statement, |mut builder| {
                if let Some(first_name) = input.first_name {
                    builder = builder.bind(("first_name", first_name));
                }
                if let Some(last_name) = input.last_name {
                    builder = builder.bind(("last_name", last_name));
                }
                if let Some(phone) = input.phone {
                    builder = builder.bind(("phone", phone));
                }
                if let Some(address) = input.address {
                    builder = builder.bind(("address", address));
                }
                if let Some(avatar_url) = input.avatar_url {
                    // Some(Some(v)) = set, Some(None) = clear
                    builder = builder.bind(("avatar_url", avatar_url));
                }
                builder
            })
            .await?;

        Ok(user)
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> SumbongResult<User> {
        let statement = "UPDATE type::record('user', $id) SET \
                         password_hash = $password_hash, \
                         password_changed_at = time::now(), \
                         updated_at = time::now() \
                         WHERE role != NONE"
            .to_string();

        Ok(self
            .write_then_read(id, statement, |builder| {
                builder.bind(("password_hash", password_hash))
            })
            .await?)
    }

    async fn delete(&self, id: Uuid) -> SumbongResult<()> {
        self.db
            .query("DELETE type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_residents(&self, pagination: Pagination) -> SumbongResult<PaginatedResult<User>> {
        Ok(self
            .page("role = 'resident'", "created_at DESC", pagination)
            .await?)
    }

    async fn list_admins(&self) -> SumbongResult<Vec<User>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_USER} user WHERE role = 'admin' ORDER BY created_at ASC"
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let admins = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(admins)
    }

    async fn list_verification_history(
        &self,
        pagination: Pagination,
    ) -> SumbongResult<PaginatedResult<User>> {
        Ok(self
            .page(
                "role = 'resident' AND verification_status != 'pending'",
                "verification_date DESC",
                pagination,
            )
            .await?)
    }

    async fn issue_token(&self, id: Uuid, input: IssueToken) -> SumbongResult<()> {
        let (hash_col, expires_col) = token_columns(input.purpose);
        let pending = input.purpose == TokenPurpose::PasswordChange;

        let statement = format!(
            "UPDATE type::record('user', $id) SET \
             {hash_col} = $hash, {expires_col} = $expires_at{}, \
             updated_at = time::now() WHERE role != NONE",
            if pending {
                ", pending_password_hash = $pending_password_hash"
            } else {
                ""
            }
        );

        self.write_then_read(id, statement, |builder| {
            let builder = builder
                .bind(("hash", input.slot.hash))
                .bind(("expires_at", input.slot.expires_at));
            if pending {
                builder.bind(("pending_password_hash", input.pending_password_hash))
            } else {
                builder
            }
        })
        .await?;

        Ok(())
    }

    async fn find_by_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> SumbongResult<User> {
        let (hash_col, expires_col) = token_columns(purpose);

        let mut result = self
            .db
            .query(format!(
                "{SELECT_USER} user WHERE {hash_col} = $hash \
                 AND {expires_col} > $now LIMIT 1"
            ))
            .bind(("hash", token_hash.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_user(rows, "token")?)
    }

    async fn consume_token(
        &self,
        id: Uuid,
        token_hash: &str,
        consumption: TokenConsumption,
        now: DateTime<Utc>,
    ) -> SumbongResult<User> {
        let (hash_col, expires_col) = token_columns(consumption.purpose());

        let (effect, guard) = match &consumption {
            TokenConsumption::VerifyEmail => ("email_verified = true", ""),
            TokenConsumption::ResetPassword { .. } => (
                "password_hash = $password_hash, password_changed_at = time::now()",
                "",
            ),
            TokenConsumption::ApplyPendingPassword => (
                "password_hash = pending_password_hash, \
                 pending_password_hash = NONE, password_changed_at = time::now()",
                " AND pending_password_hash != NONE",
            ),
        };

        let statement = format!(
            "UPDATE type::record('user', $id) SET {effect}, \
             {hash_col} = NONE, {expires_col} = NONE, updated_at = time::now() \
             WHERE {hash_col} = $hash AND {expires_col} > $now{guard}"
        );

        let user = self
            .write_then_read(id, statement, |builder| {
                let builder = builder
                    .bind(("hash", token_hash.to_string()))
                    .bind(("now", now));
                match consumption {
                    TokenConsumption::ResetPassword { password_hash } => {
                        builder.bind(("password_hash", password_hash))
                    }
                    _ => builder,
                }
            })
            .await?;

        Ok(user)
    }

    async fn apply_verification(
        &self,
        id: Uuid,
        decision: VerificationDecision,
    ) -> SumbongResult<User> {
        const RESIDENT_ONLY: &str = "WHERE role = 'resident'";

        let user = match decision {
            VerificationDecision::Approve {
                admin_id,
                admin_notes,
            } => {
                let statement = format!(
                    "UPDATE type::record('user', $id) SET \
                     verification_status = 'approved', approved = true, \
                     admin_notes = $admin_notes, issue_details = NONE, \
                     required_actions = NONE, \
                     verification_date = time::now(), verified_by = $admin_id, \
                     resubmission_requested = false, resubmission_reason = NONE, \
                     resubmission_deadline = NONE, resubmission_requested_at = NONE, \
                     updated_at = time::now() {RESIDENT_ONLY}"
                );
                self.write_then_read(id, statement, |builder| {
                    builder
                        .bind(("admin_notes", admin_notes))
                        .bind(("admin_id", admin_id.to_string()))
                })
                .await?
            }
            VerificationDecision::Reject {
                admin_id,
                issue_details,
                required_actions,
                admin_notes,
            } => {
                let statement = format!(
                    "UPDATE type::record('user', $id) SET \
                     verification_status = 'rejected', approved = false, \
                     issue_details = $issue_details, \
                     required_actions = $required_actions, \
                     admin_notes = $admin_notes, rejection_count += 1, \
                     verification_date = time::now(), verified_by = $admin_id, \
                     resubmission_requested = false, \
                     updated_at = time::now() {RESIDENT_ONLY}"
                );
                self.write_then_read(id, statement, |builder| {
                    builder
                        .bind(("issue_details", issue_details))
                        .bind(("required_actions", required_actions))
                        .bind(("admin_notes", admin_notes))
                        .bind(("admin_id", admin_id.to_string()))
                })
                .await?
            }
            VerificationDecision::RequestResubmission {
                admin_id,
                reason,
                deadline,
                admin_notes,
            } => {
                let statement = format!(
                    "UPDATE type::record('user', $id) SET \
                     verification_status = 'resubmission_required', \
                     approved = false, resubmission_requested = true, \
                     resubmission_reason = $reason, \
                     resubmission_deadline = $deadline, \
                     resubmission_requested_at = time::now(), \
                     admin_notes = $admin_notes, \
                     verification_date = time::now(), verified_by = $admin_id, \
                     updated_at = time::now() {RESIDENT_ONLY}"
                );
                self.write_then_read(id, statement, |builder| {
                    builder
                        .bind(("reason", reason))
                        .bind(("deadline", deadline))
                        .bind(("admin_notes", admin_notes))
                        .bind(("admin_id", admin_id.to_string()))
                })
                .await?
            }
            VerificationDecision::Resubmitted { files } => {
                let files = to_json("credentials", &files)?;
                let statement = format!(
                    "UPDATE type::record('user', $id) SET \
                     credentials = array::concat(credentials, $files), \
                     verification_status = 'pending', approved = false, \
                     resubmission_requested = false, \
                     updated_at = time::now() {RESIDENT_ONLY} \
                     AND verification_status IN ['pending', 'rejected', 'resubmission_required']"
                );
                self.write_then_read(id, statement, |builder| builder.bind(("files", files)))
                    .await?
            }
            VerificationDecision::SetApproval { admin_id, approved } => {
                let statement = format!(
                    "UPDATE type::record('user', $id) SET approved = $approved, \
                     verification_status = IF $approved THEN 'approved' ELSE 'pending' END, \
                     verification_date = time::now(), verified_by = $admin_id, \
                     updated_at = time::now() {RESIDENT_ONLY}"
                );
                self.write_then_read(id, statement, |builder| {
                    builder
                        .bind(("approved", approved))
                        .bind(("admin_id", admin_id.to_string()))
                })
                .await?
            }
        };

        Ok(user)
    }
}
