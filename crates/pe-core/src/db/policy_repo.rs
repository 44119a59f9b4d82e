//! Policy repository for database operations.

use super::{DbError, DbPool};
use crate::policy::{Policy, PolicyQuery, PolicyUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository trait for policy persistence.
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Creates a new policy. Fails with `DbError::Constraint` on a duplicate id or role.
    async fn create(&self, policy: &Policy) -> Result<Policy, DbError>;

    /// Gets a policy by ID.
    async fn get(&self, id: &str) -> Result<Option<Policy>, DbError>;

    /// Gets the policy governing a role, if any.
    async fn get_by_role(&self, role: &str) -> Result<Option<Policy>, DbError>;

    /// Updates a policy.
    async fn update(&self, id: &str, update: &PolicyUpdate) -> Result<Policy, DbError>;

    /// Deletes a policy. Returns false if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, DbError>;

    /// Returns policy ids filtered by role and ordered by priority.
    async fn query_ids(&self, query: &PolicyQuery) -> Result<Vec<String>, DbError>;

    /// Loads several policies, preserving the order of `ids` and skipping missing ones.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Policy>, DbError> {
        let mut policies = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(policy) = self.get(id).await? {
                policies.push(policy);
            }
        }
        Ok(policies)
    }
}

const POLICY_COLUMNS: &str = "id, role, priority, description, created_at, updated_at";

/// SQLite implementation of PolicyRepository.
#[cfg(feature = "database")]
pub struct SqlitePolicyRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqlitePolicyRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl PolicyRepository for SqlitePolicyRepository {
    async fn create(&self, policy: &Policy) -> Result<Policy, DbError> {
        sqlx::query(
            r#"
            INSERT INTO password_policies (id, role, priority, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&policy.id)
        .bind(&policy.role)
        .bind(policy.priority)
        .bind(&policy.description)
        .bind(policy.created_at.to_rfc3339())
        .bind(policy.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(policy.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Policy>, DbError> {
        let row: Option<PolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM password_policies WHERE id = ?",
            POLICY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Policy::try_from).transpose()
    }

    async fn get_by_role(&self, role: &str) -> Result<Option<Policy>, DbError> {
        let row: Option<PolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM password_policies WHERE role = ?",
            POLICY_COLUMNS
        ))
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Policy::try_from).transpose()
    }

    async fn update(&self, id: &str, update: &PolicyUpdate) -> Result<Policy, DbError> {
        let mut policy = self.get(id).await?.ok_or_else(|| DbError::NotFound {
            entity: "Policy".to_string(),
            id: id.to_string(),
        })?;
        apply_update(&mut policy, update);

        sqlx::query(
            r#"UPDATE password_policies SET priority = ?, description = ?, updated_at = ? WHERE id = ?"#,
        )
        .bind(policy.priority)
        .bind(&policy.description)
        .bind(policy.updated_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(policy)
    }

    async fn delete(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM password_policies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_ids(&self, query: &PolicyQuery) -> Result<Vec<String>, DbError> {
        if query.is_empty_selection() {
            return Ok(Vec::new());
        }

        let mut builder: sqlx::QueryBuilder<sqlx::Sqlite> =
            sqlx::QueryBuilder::new("SELECT id FROM password_policies");
        if let Some(roles) = &query.roles {
            builder.push(" WHERE role IN (");
            let mut separated = builder.separated(", ");
            for role in roles {
                separated.push_bind(role.clone());
            }
            separated.push_unseparated(")");
        }
        builder.push(format!(
            " ORDER BY priority {}, id {}",
            query.order.as_sql(),
            query.order.tie_break_sql()
        ));

        let ids: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

/// PostgreSQL implementation of PolicyRepository.
#[cfg(feature = "database")]
pub struct PgPolicyRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgPolicyRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl PolicyRepository for PgPolicyRepository {
    async fn create(&self, policy: &Policy) -> Result<Policy, DbError> {
        sqlx::query(
            r#"
            INSERT INTO password_policies (id, role, priority, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&policy.id)
        .bind(&policy.role)
        .bind(policy.priority)
        .bind(&policy.description)
        .bind(policy.created_at)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(policy.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Policy>, DbError> {
        let row: Option<PgPolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM password_policies WHERE id = $1",
            POLICY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Policy::from))
    }

    async fn get_by_role(&self, role: &str) -> Result<Option<Policy>, DbError> {
        let row: Option<PgPolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM password_policies WHERE role = $1",
            POLICY_COLUMNS
        ))
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Policy::from))
    }

    async fn update(&self, id: &str, update: &PolicyUpdate) -> Result<Policy, DbError> {
        let mut policy = self.get(id).await?.ok_or_else(|| DbError::NotFound {
            entity: "Policy".to_string(),
            id: id.to_string(),
        })?;
        apply_update(&mut policy, update);

        sqlx::query(
            r#"UPDATE password_policies SET priority = $2, description = $3, updated_at = $4 WHERE id = $1"#,
        )
        .bind(id)
        .bind(policy.priority)
        .bind(&policy.description)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(policy)
    }

    async fn delete(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM password_policies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_ids(&self, query: &PolicyQuery) -> Result<Vec<String>, DbError> {
        if query.is_empty_selection() {
            return Ok(Vec::new());
        }

        let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT id FROM password_policies");
        if let Some(roles) = &query.roles {
            builder.push(" WHERE role = ANY(");
            builder.push_bind(roles.clone());
            builder.push(")");
        }
        // Byte-wise collation keeps the tie-break identical to SQLite and the mocks.
        builder.push(format!(
            " ORDER BY priority {}, id COLLATE \"C\" {}",
            query.order.as_sql(),
            query.order.tie_break_sql()
        ));

        let ids: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

fn apply_update(policy: &mut Policy, update: &PolicyUpdate) {
    if let Some(priority) = update.priority {
        policy.priority = priority;
    }
    if let Some(description) = &update.description {
        policy.description = description.clone();
    }
    policy.updated_at = Utc::now();
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_policy_repository(pool: &DbPool) -> Box<dyn PolicyRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqlitePolicyRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgPolicyRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PolicyRow {
    id: String,
    role: String,
    priority: i32,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<PolicyRow> for Policy {
    type Error = DbError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        Ok(Policy {
            id: row.id,
            role: row.role,
            priority: row.priority,
            description: row.description,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgPolicyRow {
    id: String,
    role: String,
    priority: i32,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgPolicyRow> for Policy {
    fn from(row: PgPolicyRow) -> Self {
        Policy {
            id: row.id,
            role: row.role,
            priority: row.priority,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Serialization(format!("Invalid timestamp '{}': {}", value, e)))
}
