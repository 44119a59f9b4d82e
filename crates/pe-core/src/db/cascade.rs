//! Transactional cascade delete for SQL backends.

use super::{DbError, DbPool};
use crate::store::{CascadeBoundary, CascadeOutcome};
use async_trait::async_trait;
use tracing::debug;

/// Deletes a policy and its constraints inside a single transaction.
#[cfg(feature = "database")]
#[derive(Clone)]
pub struct SqlCascadeBoundary {
    pool: DbPool,
}

#[cfg(feature = "database")]
impl SqlCascadeBoundary {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn tx_error(e: sqlx::Error) -> DbError {
    DbError::Transaction(e.to_string())
}

#[cfg(feature = "database")]
#[async_trait]
impl CascadeBoundary for SqlCascadeBoundary {
    async fn delete_cascade(&self, policy_id: &str) -> Result<CascadeOutcome, DbError> {
        let outcome = match &self.pool {
            DbPool::Sqlite(pool) => {
                let mut tx = pool.begin().await.map_err(tx_error)?;
                let constraints =
                    sqlx::query("DELETE FROM password_constraints WHERE policy_id = ?")
                        .bind(policy_id)
                        .execute(&mut *tx)
                        .await?;
                let policy = sqlx::query("DELETE FROM password_policies WHERE id = ?")
                    .bind(policy_id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await.map_err(tx_error)?;

                CascadeOutcome {
                    constraints_deleted: constraints.rows_affected(),
                    policy_deleted: policy.rows_affected() > 0,
                }
            }
            DbPool::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(tx_error)?;
                let constraints =
                    sqlx::query("DELETE FROM password_constraints WHERE policy_id = $1")
                        .bind(policy_id)
                        .execute(&mut *tx)
                        .await?;
                let policy = sqlx::query("DELETE FROM password_policies WHERE id = $1")
                    .bind(policy_id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await.map_err(tx_error)?;

                CascadeOutcome {
                    constraints_deleted: constraints.rows_affected(),
                    policy_deleted: policy.rows_affected() > 0,
                }
            }
        };

        debug!(
            policy_id,
            constraints_deleted = outcome.constraints_deleted,
            policy_deleted = outcome.policy_deleted,
            "Cascade delete committed"
        );
        Ok(outcome)
    }
}
