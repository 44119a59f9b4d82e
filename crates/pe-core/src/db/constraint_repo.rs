//! Constraint repository for database operations.

use super::{DbError, DbPool};
use crate::policy::Constraint;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for constraint persistence.
#[async_trait]
pub trait ConstraintRepository: Send + Sync {
    /// Creates a new constraint.
    async fn create(&self, constraint: &Constraint) -> Result<Constraint, DbError>;

    /// Gets a constraint by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Constraint>, DbError>;

    /// Lists constraints owned by a policy, oldest first.
    async fn list_by_policy(&self, policy_id: &str) -> Result<Vec<Constraint>, DbError>;

    /// Deletes constraints by ID. Absent ids are ignored; returns the number removed.
    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, DbError>;
}

/// SQLite implementation of ConstraintRepository.
#[cfg(feature = "database")]
pub struct SqliteConstraintRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteConstraintRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ConstraintRepository for SqliteConstraintRepository {
    async fn create(&self, constraint: &Constraint) -> Result<Constraint, DbError> {
        let settings = serde_json::to_string(&constraint.settings)?;

        sqlx::query(
            r#"
            INSERT INTO password_constraints (id, policy_id, kind, settings, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(constraint.id.to_string())
        .bind(&constraint.policy)
        .bind(&constraint.kind)
        .bind(settings)
        .bind(constraint.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(constraint.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Constraint>, DbError> {
        let row: Option<ConstraintRow> = sqlx::query_as(
            "SELECT id, policy_id, kind, settings, created_at FROM password_constraints WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Constraint::try_from).transpose()
    }

    async fn list_by_policy(&self, policy_id: &str) -> Result<Vec<Constraint>, DbError> {
        let rows: Vec<ConstraintRow> = sqlx::query_as(
            r#"
            SELECT id, policy_id, kind, settings, created_at FROM password_constraints
            WHERE policy_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(policy_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Constraint::try_from).collect()
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, DbError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: sqlx::QueryBuilder<sqlx::Sqlite> =
            sqlx::QueryBuilder::new("DELETE FROM password_constraints WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// PostgreSQL implementation of ConstraintRepository.
#[cfg(feature = "database")]
pub struct PgConstraintRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgConstraintRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ConstraintRepository for PgConstraintRepository {
    async fn create(&self, constraint: &Constraint) -> Result<Constraint, DbError> {
        let settings = serde_json::to_string(&constraint.settings)?;

        sqlx::query(
            r#"
            INSERT INTO password_constraints (id, policy_id, kind, settings, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(constraint.id)
        .bind(&constraint.policy)
        .bind(&constraint.kind)
        .bind(settings)
        .bind(constraint.created_at)
        .execute(&self.pool)
        .await?;

        Ok(constraint.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Constraint>, DbError> {
        let row: Option<PgConstraintRow> = sqlx::query_as(
            "SELECT id, policy_id, kind, settings, created_at FROM password_constraints WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Constraint::try_from).transpose()
    }

    async fn list_by_policy(&self, policy_id: &str) -> Result<Vec<Constraint>, DbError> {
        let rows: Vec<PgConstraintRow> = sqlx::query_as(
            r#"
            SELECT id, policy_id, kind, settings, created_at FROM password_constraints
            WHERE policy_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(policy_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Constraint::try_from).collect()
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, DbError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM password_constraints WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_constraint_repository(pool: &DbPool) -> Box<dyn ConstraintRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteConstraintRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgConstraintRepository::new(pool.clone())),
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct ConstraintRow {
    id: String,
    policy_id: String,
    kind: String,
    settings: String,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<ConstraintRow> for Constraint {
    type Error = DbError;

    fn try_from(row: ConstraintRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;

        Ok(Constraint {
            id,
            policy: row.policy_id,
            kind: row.kind,
            settings: serde_json::from_str(&row.settings)?,
            created_at: super::policy_repo::parse_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgConstraintRow {
    id: Uuid,
    policy_id: String,
    kind: String,
    settings: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgConstraintRow> for Constraint {
    type Error = DbError;

    fn try_from(row: PgConstraintRow) -> Result<Self, Self::Error> {
        Ok(Constraint {
            id: row.id,
            policy: row.policy_id,
            kind: row.kind,
            settings: serde_json::from_str(&row.settings)?,
            created_at: row.created_at,
        })
    }
}
