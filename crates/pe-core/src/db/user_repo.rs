//! User repository for database operations.

use super::{DbError, DbPool};
use crate::auth::User;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

/// Repository trait for the user password state.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a new user.
    async fn create(&self, user: &User) -> Result<User, DbError>;

    /// Gets a user by ID.
    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError>;

    /// Sets or clears the password-change-required flag.
    async fn set_password_change_required(&self, id: Uuid, required: bool)
        -> Result<(), DbError>;
}

/// SQLite implementation of UserRepository.
#[cfg(feature = "database")]
pub struct SqliteUserRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteUserRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        let roles = serde_json::to_string(&user.roles)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, roles, password_change_required, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(roles)
        .bind(user.password_change_required)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, roles, password_change_required, created_at, updated_at
            FROM users WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn set_password_change_required(
        &self,
        id: Uuid,
        required: bool,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE users SET password_change_required = ?, updated_at = ? WHERE id = ?",
        )
        .bind(required)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "User".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// PostgreSQL implementation of UserRepository.
#[cfg(feature = "database")]
pub struct PgUserRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgUserRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        let roles = serde_json::to_string(&user.roles)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, roles, password_change_required, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(roles)
        .bind(user.password_change_required)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let row: Option<PgUserRow> = sqlx::query_as(
            r#"
            SELECT id, username, roles, password_change_required, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn set_password_change_required(
        &self,
        id: Uuid,
        required: bool,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE users SET password_change_required = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(required)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "User".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_user_repository(pool: &DbPool) -> Box<dyn UserRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteUserRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgUserRepository::new(pool.clone())),
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    roles: String,
    password_change_required: bool,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        use super::policy_repo::parse_timestamp;

        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;

        Ok(User {
            id,
            username: row.username,
            roles: serde_json::from_str(&row.roles)?,
            password_change_required: row.password_change_required,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgUserRow {
    id: Uuid,
    username: String,
    roles: String,
    password_change_required: bool,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgUserRow> for User {
    type Error = DbError;

    fn try_from(row: PgUserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            roles: serde_json::from_str(&row.roles)?,
            password_change_required: row.password_change_required,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
