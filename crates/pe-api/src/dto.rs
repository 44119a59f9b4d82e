//! Request and response bodies for the JSON API.

use pe_core::{Constraint, DeleteReport, NewConstraint, NewPolicy, Policy, PolicyUpdate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::messages::FlashMessage;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Policy as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub id: String,
    pub role: String,
    pub priority: i32,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Policy> for PolicyResponse {
    fn from(policy: Policy) -> Self {
        Self {
            id: policy.id,
            role: policy.role,
            priority: policy.priority,
            description: policy.description,
            created_at: policy.created_at.to_rfc3339(),
            updated_at: policy.updated_at.to_rfc3339(),
        }
    }
}

/// Constraint as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintResponse {
    pub id: Uuid,
    pub policy: String,
    pub kind: String,
    pub settings: serde_json::Value,
    pub created_at: String,
}

impl From<Constraint> for ConstraintResponse {
    fn from(constraint: Constraint) -> Self {
        Self {
            id: constraint.id,
            policy: constraint.policy,
            kind: constraint.kind,
            settings: constraint.settings,
            created_at: constraint.created_at.to_rfc3339(),
        }
    }
}

/// Request to create a policy.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePolicyRequest {
    /// Role governed by the policy; also becomes the policy id.
    #[validate(length(min = 1, max = 128))]
    pub role: String,
    #[serde(default)]
    pub priority: i32,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

impl From<CreatePolicyRequest> for NewPolicy {
    fn from(req: CreatePolicyRequest) -> Self {
        NewPolicy {
            role: req.role,
            priority: req.priority,
            description: req.description,
        }
    }
}

/// Request to update a policy.
#[derive(Debug, Deserialize)]
pub struct UpdatePolicyRequest {
    pub priority: Option<i32>,
    /// Send `null` to clear the description.
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
}

impl From<UpdatePolicyRequest> for PolicyUpdate {
    fn from(req: UpdatePolicyRequest) -> Self {
        PolicyUpdate {
            priority: req.priority,
            description: req.description,
        }
    }
}

/// Request to add a constraint to a policy.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConstraintRequest {
    /// Rule plugin name, e.g. `minimum_characters`.
    #[validate(length(min = 1, max = 128))]
    pub kind: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl CreateConstraintRequest {
    pub fn into_new_constraint(self, policy: String) -> NewConstraint {
        NewConstraint {
            policy,
            kind: self.kind,
            settings: self.settings,
        }
    }
}

/// Query parameters for listing and resolving policies.
#[derive(Debug, Default, Deserialize)]
pub struct PolicyListQuery {
    /// Comma-separated roles. Absent selects all policies, empty selects none.
    pub roles: Option<String>,
    /// `asc` or `desc` (default).
    pub order: Option<String>,
}

/// Result of resolving the governing policy.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub policy: Option<PolicyResponse>,
}

/// Result of a policy delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: Vec<String>,
    pub missing: Vec<String>,
    pub constraints_deleted: u64,
}

impl From<DeleteReport> for DeleteResponse {
    fn from(report: DeleteReport) -> Self {
        Self {
            deleted: report.deleted,
            missing: report.missing,
            constraints_deleted: report.constraints_deleted,
        }
    }
}

/// Request to flag or unflag a user for a password change.
#[derive(Debug, Deserialize)]
pub struct PasswordStateRequest {
    pub password_change_required: bool,
}

/// What the password-change page needs to render.
#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordChangeResponse {
    pub user_id: Uuid,
    pub username: String,
    pub password_change_required: bool,
    pub reset_token_pending: bool,
    pub policy: Option<PolicyResponse>,
    pub constraints: Vec<ConstraintResponse>,
    pub messages: Vec<FlashMessage>,
}

/// Drained flash messages.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<FlashMessage>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
