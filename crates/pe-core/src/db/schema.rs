//! Database schema setup.

use super::{DbError, DbPool};

/// Creates the tables if they do not exist yet.
#[cfg(feature = "database")]
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    use tracing::info;

    let map_err = |e: sqlx::Error| DbError::Migration(e.to_string());

    match pool {
        DbPool::Sqlite(pool) => {
            info!("Running SQLite migrations");
            sqlx::raw_sql(sql::SQLITE_SCHEMA)
                .execute(pool)
                .await
                .map_err(map_err)?;
        }
        DbPool::Postgres(pool) => {
            info!("Running PostgreSQL migrations");
            sqlx::raw_sql(sql::POSTGRES_SCHEMA)
                .execute(pool)
                .await
                .map_err(map_err)?;
        }
    }

    info!("Migrations completed successfully");
    Ok(())
}

#[cfg(not(feature = "database"))]
pub async fn run_migrations(_pool: &DbPool) -> Result<(), DbError> {
    Err(DbError::Configuration(
        "Database support not enabled".to_string(),
    ))
}

/// Schema definitions.
///
/// `password_constraints.policy_id` references its policy without
/// `ON DELETE CASCADE`; the policy store deletes constraints first.
pub mod sql {
    pub const SQLITE_SCHEMA: &str = r#"
        CREATE TABLE IF NOT EXISTS password_policies (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL UNIQUE,
            priority INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_password_policies_priority
            ON password_policies(priority);

        CREATE TABLE IF NOT EXISTS password_constraints (
            id TEXT PRIMARY KEY,
            policy_id TEXT NOT NULL REFERENCES password_policies(id),
            kind TEXT NOT NULL,
            settings TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_password_constraints_policy_id
            ON password_constraints(policy_id);

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            roles TEXT NOT NULL DEFAULT '[]',
            password_change_required INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#;

    pub const POSTGRES_SCHEMA: &str = r#"
        CREATE TABLE IF NOT EXISTS password_policies (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL UNIQUE,
            priority INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_password_policies_priority
            ON password_policies(priority);

        CREATE TABLE IF NOT EXISTS password_constraints (
            id UUID PRIMARY KEY,
            policy_id TEXT NOT NULL REFERENCES password_policies(id),
            kind TEXT NOT NULL,
            settings TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_password_constraints_policy_id
            ON password_constraints(policy_id);

        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            roles TEXT NOT NULL DEFAULT '[]',
            password_change_required BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL
        );
    "#;
}
