//! Policy store: policy CRUD with constraint cascade.
//!
//! Policies are keyed by role. Deleting a policy removes its constraints
//! first and the policy record second, so an interrupted delete leaves
//! "constraints gone, policy present" behind, which a retry cleans up.
//! Backends that can run both steps atomically plug in a [`CascadeBoundary`].

use crate::db::{ConstraintRepository, DbError, PolicyRepository};
use crate::error::{CascadeStep, PolicyError};
use crate::policy::{
    Constraint, NewConstraint, NewPolicy, Policy, PolicyQuery, PolicyUpdate, QueryOrder,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a cascade delete run inside a transactional boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub constraints_deleted: u64,
    pub policy_deleted: bool,
}

/// Hook for stores that can delete a policy and its constraints atomically.
#[async_trait]
pub trait CascadeBoundary: Send + Sync {
    /// Deletes every constraint referencing `policy_id`, then the policy.
    /// Must be a no-op for a policy that no longer exists.
    async fn delete_cascade(&self, policy_id: &str) -> Result<CascadeOutcome, DbError>;
}

/// Summary of a delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Policies that existed and were removed.
    pub deleted: Vec<String>,
    /// Requested ids with no policy record.
    pub missing: Vec<String>,
    /// Total constraints removed across all policies.
    pub constraints_deleted: u64,
}

/// Owns policy records and cascades deletes to their constraints.
#[derive(Clone)]
pub struct PolicyStore {
    policies: Arc<dyn PolicyRepository>,
    constraints: Arc<dyn ConstraintRepository>,
    cascade: Option<Arc<dyn CascadeBoundary>>,
}

impl PolicyStore {
    pub fn new(
        policies: Arc<dyn PolicyRepository>,
        constraints: Arc<dyn ConstraintRepository>,
    ) -> Self {
        Self {
            policies,
            constraints,
            cascade: None,
        }
    }

    /// Routes policy deletes through a transactional boundary.
    pub fn with_cascade_boundary(mut self, boundary: Arc<dyn CascadeBoundary>) -> Self {
        self.cascade = Some(boundary);
        self
    }

    /// Creates a policy for a role. The id is derived from the role.
    pub async fn create(&self, input: NewPolicy) -> Result<Policy, PolicyError> {
        let role = input.role.trim();
        if role.is_empty() {
            return Err(PolicyError::Validation("role must not be empty".to_string()));
        }

        if self.policies.get_by_role(role).await?.is_some()
            || self.policies.get(role).await?.is_some()
        {
            return Err(PolicyError::DuplicateRole(role.to_string()));
        }

        let mut policy = Policy::new(role, input.priority);
        policy.description = input.description;

        let created = match self.policies.create(&policy).await {
            Ok(created) => created,
            // Lost a race with a concurrent create for the same role.
            Err(DbError::Constraint(_)) => {
                return Err(PolicyError::DuplicateRole(policy.role.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            policy_id = %created.id,
            priority = created.priority,
            "Password policy created"
        );
        Ok(created)
    }

    /// Loads a policy by id.
    pub async fn load(&self, id: &str) -> Result<Policy, PolicyError> {
        self.policies
            .get(id)
            .await?
            .ok_or_else(|| PolicyError::NotFound(id.to_string()))
    }

    /// Loads several policies in the given order, skipping ids that do not exist.
    pub async fn load_many(&self, ids: &[String]) -> Result<Vec<Policy>, PolicyError> {
        Ok(self.policies.get_many(ids).await?)
    }

    /// Updates priority or description of a policy.
    pub async fn update(&self, id: &str, update: PolicyUpdate) -> Result<Policy, PolicyError> {
        let updated = self.policies.update(id, &update).await.map_err(|e| match e {
            DbError::NotFound { .. } => PolicyError::NotFound(id.to_string()),
            other => PolicyError::Storage(other),
        })?;

        info!(policy_id = %id, priority = updated.priority, "Password policy updated");
        Ok(updated)
    }

    /// Deletes policies together with their constraints.
    ///
    /// Ids without a policy record are reported as missing, not as errors.
    /// The first failure stops the run; policies handled before it stay deleted.
    pub async fn delete(&self, ids: &[String]) -> Result<DeleteReport, PolicyError> {
        let mut report = DeleteReport::default();

        for id in ids {
            if report.deleted.contains(id) || report.missing.contains(id) {
                continue;
            }

            let outcome = match &self.cascade {
                Some(boundary) => boundary
                    .delete_cascade(id)
                    .await
                    .map_err(|e| PolicyError::cascade(id, CascadeStep::Transaction, e)),
                None => self.delete_two_phase(id).await,
            }
            .map_err(|e| {
                warn!(policy_id = %id, error = %e, "Password policy delete failed");
                e
            })?;

            report.constraints_deleted += outcome.constraints_deleted;
            if outcome.policy_deleted {
                info!(
                    policy_id = %id,
                    constraints_deleted = outcome.constraints_deleted,
                    "Password policy deleted"
                );
                report.deleted.push(id.clone());
            } else {
                debug!(policy_id = %id, "Password policy already absent");
                report.missing.push(id.clone());
            }
        }

        Ok(report)
    }

    async fn delete_two_phase(&self, id: &str) -> Result<CascadeOutcome, PolicyError> {
        let constraint_ids: Vec<Uuid> = self
            .constraints
            .list_by_policy(id)
            .await
            .map_err(|e| PolicyError::cascade(id, CascadeStep::LoadConstraints, e))?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let constraints_deleted = if constraint_ids.is_empty() {
            0
        } else {
            self.constraints
                .delete_many(&constraint_ids)
                .await
                .map_err(|e| PolicyError::cascade(id, CascadeStep::DeleteConstraints, e))?
        };

        let policy_deleted = self
            .policies
            .delete(id)
            .await
            .map_err(|e| PolicyError::cascade(id, CascadeStep::DeletePolicy, e))?;

        Ok(CascadeOutcome {
            constraints_deleted,
            policy_deleted,
        })
    }

    /// Returns policy ids matching `roles`, ranked by priority.
    ///
    /// `None` selects every policy; an empty slice selects none.
    pub async fn query_by_roles_and_priority(
        &self,
        roles: Option<&[String]>,
        order: QueryOrder,
    ) -> Result<Vec<String>, PolicyError> {
        let query = PolicyQuery::new(roles, order);
        if query.is_empty_selection() {
            return Ok(Vec::new());
        }
        Ok(self.policies.query_ids(&query).await?)
    }

    /// Adds a constraint to an existing policy.
    pub async fn add_constraint(&self, input: NewConstraint) -> Result<Constraint, PolicyError> {
        if input.kind.trim().is_empty() {
            return Err(PolicyError::Validation(
                "constraint kind must not be empty".to_string(),
            ));
        }
        if self.policies.get(&input.policy).await?.is_none() {
            return Err(PolicyError::Validation(format!(
                "constraint references unknown policy '{}'",
                input.policy
            )));
        }

        let mut constraint = Constraint::new(input.policy, input.kind.trim());
        if !input.settings.is_null() {
            constraint.settings = input.settings;
        }

        let created = self.constraints.create(&constraint).await?;
        info!(
            constraint_id = %created.id,
            policy_id = %created.policy,
            kind = %created.kind,
            "Password constraint added"
        );
        Ok(created)
    }

    /// Lists the constraints owned by a policy.
    pub async fn constraints_for(&self, policy_id: &str) -> Result<Vec<Constraint>, PolicyError> {
        Ok(self.constraints.list_by_policy(policy_id).await?)
    }

    /// Deletes one constraint of `policy_id`. A constraint owned by another
    /// policy is reported as missing and left untouched.
    pub async fn delete_constraint(
        &self,
        policy_id: &str,
        constraint_id: Uuid,
    ) -> Result<(), PolicyError> {
        let owned = self
            .constraints
            .get(constraint_id)
            .await?
            .is_some_and(|c| c.policy == policy_id);
        if !owned {
            debug!(policy_id, constraint_id = %constraint_id, "Constraint not owned by policy");
            return Err(PolicyError::ConstraintNotFound {
                policy_id: policy_id.to_string(),
                constraint_id,
            });
        }

        self.delete_constraints(&[constraint_id]).await?;
        Ok(())
    }

    /// Deletes constraints directly. Absent ids are ignored.
    pub async fn delete_constraints(&self, ids: &[Uuid]) -> Result<u64, PolicyError> {
        let removed = self.constraints.delete_many(ids).await?;
        if removed > 0 {
            info!(count = removed, "Password constraints deleted");
        }
        Ok(removed)
    }
}
