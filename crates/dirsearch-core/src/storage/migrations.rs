//! Database migrations
//!
//! Versioned schema for the directory tables. Migrations are applied in
//! order on connection and recorded in `_migrations`.

use crate::domain::search::term::fold_case;
use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 3;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Directory schema
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS realms (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS principals (
        id TEXT PRIMARY KEY NOT NULL,
        realm_id TEXT NOT NULL REFERENCES realms(id) ON DELETE CASCADE,
        username TEXT NOT NULL,
        email TEXT,
        first_name TEXT,
        last_name TEXT,
        enabled BOOLEAN NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (realm_id, username)
    );

    CREATE INDEX IF NOT EXISTS idx_principals_realm ON principals(realm_id);

    -- Many rows per principal, possibly several with the same name
    CREATE TABLE IF NOT EXISTS principal_attributes (
        id TEXT PRIMARY KEY NOT NULL,
        principal_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        value TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_principal_attributes_principal
        ON principal_attributes(principal_id);
    CREATE INDEX IF NOT EXISTS idx_principal_attributes_name
        ON principal_attributes(name);

    CREATE TABLE IF NOT EXISTS principal_groups (
        id TEXT PRIMARY KEY NOT NULL,
        realm_id TEXT NOT NULL REFERENCES realms(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        UNIQUE (realm_id, name)
    );

    CREATE TABLE IF NOT EXISTS group_memberships (
        principal_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
        group_id TEXT NOT NULL REFERENCES principal_groups(id) ON DELETE CASCADE,
        PRIMARY KEY (principal_id, group_id)
    );

    CREATE INDEX IF NOT EXISTS idx_group_memberships_group ON group_memberships(group_id);
"#;

/// Migration 2: Case-insensitive lookup indexes
const MIGRATION_V2: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_principals_username_lower
        ON principals(realm_id, lower(username));
    CREATE INDEX IF NOT EXISTS idx_principal_attributes_name_value
        ON principal_attributes(name, lower(value));
"#;

/// Migration 3: Case-folded shadow columns.
///
/// SQLite's `lower()` and `LIKE` fold ASCII only, so searchable text is
/// stored a second time folded by `fold_case` and compared on that copy.
const MIGRATION_V3: &str = r#"
    ALTER TABLE principals ADD COLUMN username_lower TEXT NOT NULL DEFAULT '';
    ALTER TABLE principals ADD COLUMN email_lower TEXT;
    ALTER TABLE principals ADD COLUMN first_name_lower TEXT;
    ALTER TABLE principals ADD COLUMN last_name_lower TEXT;
    ALTER TABLE principal_attributes ADD COLUMN value_lower TEXT;
    ALTER TABLE principal_groups ADD COLUMN name_lower TEXT NOT NULL DEFAULT '';

    DROP INDEX IF EXISTS idx_principals_username_lower;
    DROP INDEX IF EXISTS idx_principal_attributes_name_value;

    CREATE INDEX IF NOT EXISTS idx_principals_username_folded
        ON principals(realm_id, username_lower);
    CREATE INDEX IF NOT EXISTS idx_principal_attributes_name_folded
        ON principal_attributes(name, value_lower);
    CREATE INDEX IF NOT EXISTS idx_principal_groups_name_folded
        ON principal_groups(realm_id, name_lower);
"#;

/// Every migration in application order
const MIGRATIONS: &[(i32, &str, &str)] = &[
    (1, "Directory schema", MIGRATION_V1),
    (2, "Case-insensitive lookup indexes", MIGRATION_V2),
    (3, "Case-folded shadow columns", MIGRATION_V3),
];

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    // MAX over an empty table is NULL
    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fill the case-folded columns from the stored text
async fn backfill_folded_columns(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    let principals: Vec<(String, String, Option<String>, Option<String>, Option<String>)> =
        sqlx::query_as("SELECT id, username, email, first_name, last_name FROM principals")
            .fetch_all(&mut *tx)
            .await?;
    for (id, username, email, first_name, last_name) in &principals {
        sqlx::query(
            "UPDATE principals SET username_lower = ?, email_lower = ?, \
             first_name_lower = ?, last_name_lower = ? WHERE id = ?",
        )
        .bind(fold_case(username))
        .bind(email.as_deref().map(fold_case))
        .bind(first_name.as_deref().map(fold_case))
        .bind(last_name.as_deref().map(fold_case))
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    let attributes: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT id, value FROM principal_attributes")
            .fetch_all(&mut *tx)
            .await?;
    for (id, value) in &attributes {
        sqlx::query("UPDATE principal_attributes SET value_lower = ? WHERE id = ?")
            .bind(value.as_deref().map(fold_case))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let groups: Vec<(String, String)> = sqlx::query_as("SELECT id, name FROM principal_groups")
        .fetch_all(&mut *tx)
        .await?;
    for (id, name) in &groups {
        sqlx::query("UPDATE principal_groups SET name_lower = ? WHERE id = ?")
            .bind(fold_case(name))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        principals = principals.len(),
        attributes = attributes.len(),
        groups = groups.len(),
        "Backfilled case-folded columns"
    );
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    migrate_to(pool, CURRENT_VERSION).await
}

/// Apply pending migrations up to and including `target`
async fn migrate_to(pool: &SqlitePool, target: i32) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = target,
        "Checking database migrations"
    );

    if current_version >= target {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    for (version, description, sql) in MIGRATIONS {
        if current_version < *version && *version <= target {
            tracing::info!("Applying migration v{}: {}", version, description);
            sqlx::raw_sql(sql).execute(pool).await?;
            if *version == 3 {
                backfill_folded_columns(pool).await?;
            }
            record_migration(pool, *version).await?;
        }
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Check if the database needs migrations
pub async fn needs_migration(pool: &SqlitePool) -> anyhow::Result<bool> {
    let current_version = get_current_version(pool).await?;
    Ok(current_version < CURRENT_VERSION)
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone, serde::Serialize)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}
