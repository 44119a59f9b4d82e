//! Policy store error types.

use crate::db::DbError;
use thiserror::Error;

/// Step of a cascade delete that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    /// Looking up the constraints that reference the policy.
    LoadConstraints,
    /// Removing those constraints.
    DeleteConstraints,
    /// Removing the policy record itself.
    DeletePolicy,
    /// The transactional boundary rejected or rolled back the delete.
    Transaction,
}

impl std::fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let step = match self {
            CascadeStep::LoadConstraints => "load_constraints",
            CascadeStep::DeleteConstraints => "delete_constraints",
            CascadeStep::DeletePolicy => "delete_policy",
            CascadeStep::Transaction => "transaction",
        };
        write!(f, "{}", step)
    }
}

/// Errors surfaced by the policy store and resolver.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Malformed input at create time.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A policy already governs this role.
    #[error("A policy for role '{0}' already exists")]
    DuplicateRole(String),

    /// The requested policy does not exist.
    #[error("Policy not found: {0}")]
    NotFound(String),

    /// The constraint does not exist or belongs to another policy.
    #[error("Constraint {constraint_id} not found on policy '{policy_id}'")]
    ConstraintNotFound {
        policy_id: String,
        constraint_id: uuid::Uuid,
    },

    /// A cascade delete failed part way. Retrying the delete is safe.
    #[error("Cascade delete of policy '{policy_id}' failed at {step}: {source}")]
    CascadeDelete {
        policy_id: String,
        step: CascadeStep,
        #[source]
        source: DbError,
    },

    /// Underlying storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl PolicyError {
    pub(crate) fn cascade(policy_id: &str, step: CascadeStep, source: DbError) -> Self {
        PolicyError::CascadeDelete {
            policy_id: policy_id.to_string(),
            step,
            source,
        }
    }
}
