//! Selects the governing password policy for a set of roles.

use crate::auth::User;
use crate::error::PolicyError;
use crate::policy::{Policy, QueryOrder};
use crate::store::PolicyStore;
use std::sync::Arc;
use tracing::debug;

/// Read-only selection over the policy store. Holds no cache.
#[derive(Clone)]
pub struct PolicyResolver {
    store: Arc<PolicyStore>,
}

impl PolicyResolver {
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self { store }
    }

    /// Returns the highest-ranked policy for `roles` under `order`, if any.
    ///
    /// A candidate deleted between the query and the load is skipped.
    pub async fn resolve_one(
        &self,
        roles: Option<&[String]>,
        order: QueryOrder,
    ) -> Result<Option<Policy>, PolicyError> {
        let ids = self.store.query_by_roles_and_priority(roles, order).await?;

        for id in ids {
            match self.store.load(&id).await {
                Ok(policy) => return Ok(Some(policy)),
                Err(PolicyError::NotFound(_)) => {
                    debug!(policy_id = %id, "Candidate policy vanished before load");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Returns every policy for `roles` in ranked order.
    pub async fn resolve_all(
        &self,
        roles: Option<&[String]>,
        order: QueryOrder,
    ) -> Result<Vec<Policy>, PolicyError> {
        let ids = self.store.query_by_roles_and_priority(roles, order).await?;
        self.store.load_many(&ids).await
    }

    /// Returns the policy governing a user's password.
    pub async fn resolve_for_user(&self, user: &User) -> Result<Option<Policy>, PolicyError> {
        self.resolve_one(Some(&user.roles), QueryOrder::Desc).await
    }
}
