//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs and calendar
//! months are stored as strings, amounts as integer paisa, and enums
//! as their wire names guarded by ASSERT constraints.

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
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE option<string>;
DEFINE FIELD mobile ON TABLE user TYPE option<string>;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD is_email_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD is_mobile_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_mobile ON TABLE user COLUMNS mobile UNIQUE;

-- =======================================================================
-- Chits
-- =======================================================================
DEFINE TABLE chit SCHEMAFULL;
DEFINE FIELD name ON TABLE chit TYPE string;
DEFINE FIELD fund_amount ON TABLE chit TYPE int ASSERT $value > 0;
DEFINE FIELD tenure ON TABLE chit TYPE int ASSERT $value > 0;
DEFINE FIELD member_count ON TABLE chit TYPE int ASSERT $value > 0;
DEFINE FIELD start_month ON TABLE chit TYPE string;
DEFINE FIELD end_month ON TABLE chit TYPE string;
DEFINE FIELD payout_method ON TABLE chit TYPE string \
    ASSERT $value IN ['RANDOM', 'VOTING'];
DEFINE FIELD moderator_id ON TABLE chit TYPE string;
DEFINE FIELD status ON TABLE chit TYPE string \
    ASSERT $value IN ['OPEN', 'ACTIVE', 'CLOSED'];
DEFINE FIELD created_at ON TABLE chit TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_chit_moderator ON TABLE chit COLUMNS moderator_id;

-- =======================================================================
-- Memberships (chit scope, one per chit and user)
-- =======================================================================
DEFINE TABLE member SCHEMAFULL;
DEFINE FIELD chit_id ON TABLE member TYPE string;
DEFINE FIELD user_id ON TABLE member TYPE string;
DEFINE FIELD status ON TABLE member TYPE string \
    ASSERT $value IN ['INVITED', 'JOINED', 'APPROVED', 'REJECTED'];
DEFINE FIELD joined_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_chit_user ON TABLE member \
    COLUMNS chit_id, user_id UNIQUE;
DEFINE INDEX idx_member_user ON TABLE member COLUMNS user_id;

-- =======================================================================
-- Payments (chit scope, one per chit, member and month)
-- =======================================================================
DEFINE TABLE payment SCHEMAFULL;
DEFINE FIELD chit_id ON TABLE payment TYPE string;
DEFINE FIELD member_id ON TABLE payment TYPE string;
DEFINE FIELD amount ON TABLE payment TYPE int ASSERT $value > 0;
DEFINE FIELD month ON TABLE payment TYPE string;
DEFINE FIELD status ON TABLE payment TYPE string \
    ASSERT $value IN ['PENDING', 'PAID', 'OVERDUE'];
DEFINE FIELD paid_at ON TABLE payment TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE payment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_payment_chit_member_month ON TABLE payment \
    COLUMNS chit_id, member_id, month UNIQUE;

-- =======================================================================
-- Payouts (chit scope, one per chit and month)
-- =======================================================================
DEFINE TABLE payout SCHEMAFULL;
DEFINE FIELD chit_id ON TABLE payout TYPE string;
DEFINE FIELD recipient_id ON TABLE payout TYPE string;
DEFINE FIELD amount ON TABLE payout TYPE int ASSERT $value > 0;
DEFINE FIELD month ON TABLE payout TYPE string;
DEFINE FIELD status ON TABLE payout TYPE string \
    ASSERT $value IN ['PENDING', 'PAID'];
DEFINE FIELD paid_at ON TABLE payout TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE payout TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_payout_chit_month ON TABLE payout \
    COLUMNS chit_id, month UNIQUE;

-- =======================================================================
-- Refresh tokens
-- =======================================================================
DEFINE TABLE refresh_token SCHEMAFULL;
DEFINE FIELD user_id ON TABLE refresh_token TYPE string;
DEFINE FIELD token_hash ON TABLE refresh_token TYPE string;
DEFINE FIELD expires_at ON TABLE refresh_token TYPE datetime;
DEFINE FIELD created_at ON TABLE refresh_token TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_refresh_token_hash ON TABLE refresh_token \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_refresh_token_user ON TABLE refresh_token \
    COLUMNS user_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
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
        if migration.version <= current_version {
            continue;
        }

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

        db.query("CREATE _migration SET version = $version, name = $name")
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

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_table() {
        for table in ["user", "chit", "member", "payment", "payout", "refresh_token"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
