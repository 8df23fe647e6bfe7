//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Nested lists (credentials,
//! evidence, feedback entries) define every sub-field so SCHEMAFULL
//! does not strip them.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (residents and admins)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD phone ON TABLE user TYPE string;
DEFINE FIELD address ON TABLE user TYPE string;
DEFINE FIELD avatar_url ON TABLE user TYPE option<string>;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['resident', 'admin'];
DEFINE FIELD auth_provider ON TABLE user TYPE string \
    ASSERT $value IN ['password', 'google'];
DEFINE FIELD credentials ON TABLE user TYPE array<object> DEFAULT [];
DEFINE FIELD credentials[*].url ON TABLE user TYPE string;
DEFINE FIELD credentials[*].storage_id ON TABLE user TYPE string;
DEFINE FIELD credentials[*].uploaded_at ON TABLE user TYPE string;
DEFINE FIELD verification_status ON TABLE user TYPE string \
    ASSERT $value IN ['pending', 'approved', 'rejected', \
    'resubmission_required'];
DEFINE FIELD approved ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD admin_notes ON TABLE user TYPE option<string>;
DEFINE FIELD issue_details ON TABLE user TYPE option<string>;
DEFINE FIELD required_actions ON TABLE user TYPE option<string>;
DEFINE FIELD rejection_count ON TABLE user TYPE int DEFAULT 0;
DEFINE FIELD verification_date ON TABLE user TYPE option<datetime>;
DEFINE FIELD verified_by ON TABLE user TYPE option<string>;
DEFINE FIELD resubmission_requested ON TABLE user TYPE bool \
    DEFAULT false;
DEFINE FIELD resubmission_reason ON TABLE user TYPE option<string>;
DEFINE FIELD resubmission_deadline ON TABLE user TYPE option<datetime>;
DEFINE FIELD resubmission_requested_at ON TABLE user \
    TYPE option<datetime>;
DEFINE FIELD email_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD email_verification_hash ON TABLE user TYPE option<string>;
DEFINE FIELD email_verification_expires ON TABLE user \
    TYPE option<datetime>;
DEFINE FIELD password_reset_hash ON TABLE user TYPE option<string>;
DEFINE FIELD password_reset_expires ON TABLE user TYPE option<datetime>;
DEFINE FIELD password_change_hash ON TABLE user TYPE option<string>;
DEFINE FIELD password_change_expires ON TABLE user TYPE option<datetime>;
DEFINE FIELD pending_password_hash ON TABLE user TYPE option<string>;
DEFINE FIELD password_changed_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD accepted_terms ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD accepted_privacy ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD policy_version ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD policy_accepted_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_role ON TABLE user COLUMNS role;
DEFINE INDEX idx_user_email_verification ON TABLE user \
    COLUMNS email_verification_hash;
DEFINE INDEX idx_user_password_reset ON TABLE user \
    COLUMNS password_reset_hash;
DEFINE INDEX idx_user_password_change ON TABLE user \
    COLUMNS password_change_hash;

-- =======================================================================
-- Complaints
-- =======================================================================
DEFINE TABLE complaint SCHEMAFULL;
DEFINE FIELD reporter_id ON TABLE complaint TYPE string;
DEFINE FIELD anonymous ON TABLE complaint TYPE bool DEFAULT false;
DEFINE FIELD confidential ON TABLE complaint TYPE bool DEFAULT false;
DEFINE FIELD incident_date ON TABLE complaint TYPE string;
DEFINE FIELD incident_time ON TABLE complaint TYPE string;
DEFINE FIELD location ON TABLE complaint TYPE string;
DEFINE FIELD latitude ON TABLE complaint TYPE option<float>;
DEFINE FIELD longitude ON TABLE complaint TYPE option<float>;
DEFINE FIELD people_involved ON TABLE complaint TYPE string;
DEFINE FIELD description ON TABLE complaint TYPE string;
DEFINE FIELD requested_resolution ON TABLE complaint TYPE string;
DEFINE FIELD complaint_type ON TABLE complaint TYPE string;
DEFINE FIELD evidence ON TABLE complaint TYPE array<object> DEFAULT [];
DEFINE FIELD evidence[*].url ON TABLE complaint TYPE string;
DEFINE FIELD evidence[*].storage_id ON TABLE complaint TYPE string;
DEFINE FIELD evidence[*].content_type ON TABLE complaint \
    TYPE option<string>;
DEFINE FIELD status ON TABLE complaint TYPE string \
    ASSERT $value IN ['pending', 'in progress', 'solved'];
DEFINE FIELD feedback ON TABLE complaint TYPE option<string>;
DEFINE FIELD feedback_entries ON TABLE complaint TYPE array<object> \
    DEFAULT [];
DEFINE FIELD feedback_entries[*].message ON TABLE complaint TYPE string;
DEFINE FIELD feedback_entries[*].author_type ON TABLE complaint \
    TYPE string ASSERT $value IN ['user', 'admin'];
DEFINE FIELD feedback_entries[*].created_at ON TABLE complaint \
    TYPE string;
DEFINE FIELD deleted_at ON TABLE complaint TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE complaint TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE complaint TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_complaint_reporter ON TABLE complaint \
    COLUMNS reporter_id;
DEFINE INDEX idx_complaint_status ON TABLE complaint COLUMNS status;

-- =======================================================================
-- Notifications (admin-facing, append-only)
-- =======================================================================
DEFINE TABLE notification SCHEMAFULL;
DEFINE FIELD recipient_id ON TABLE notification TYPE string;
DEFINE FIELD kind ON TABLE notification TYPE string \
    ASSERT $value IN ['new_user', 'new_complaint', 'user_feedback', \
    'credential_resubmitted'];
DEFINE FIELD entity_type ON TABLE notification TYPE string \
    ASSERT $value IN ['user', 'complaint'];
DEFINE FIELD entity_id ON TABLE notification TYPE string;
DEFINE FIELD message ON TABLE notification TYPE string;
DEFINE FIELD meta ON TABLE notification TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD read ON TABLE notification TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE notification TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_notification_recipient ON TABLE notification \
    COLUMNS recipient_id, read;
";

/// Run all pending migrations against the database.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
