//! Mock implementation of PolicyRepository for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::{DbError, PolicyRepository};
use crate::policy::{Policy, PolicyQuery, PolicyUpdate};

/// Mock implementation of PolicyRepository using in-memory storage.
pub struct MockPolicyRepository {
    policies: Arc<RwLock<HashMap<String, Policy>>>,
}

impl Default for MockPolicyRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPolicyRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self {
            policies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a mock repository pre-populated with policies.
    pub fn with_policies(policies: Vec<Policy>) -> Self {
        let map: HashMap<String, Policy> =
            policies.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            policies: Arc::new(RwLock::new(map)),
        }
    }

    /// Gets a snapshot of all policies in the mock.
    pub async fn snapshot(&self) -> Vec<Policy> {
        self.policies.read().await.values().cloned().collect()
    }

    /// Clears all policies from the mock.
    pub async fn clear(&self) {
        self.policies.write().await.clear();
    }
}

#[async_trait]
impl PolicyRepository for MockPolicyRepository {
    async fn create(&self, policy: &Policy) -> Result<Policy, DbError> {
        let mut policies = self.policies.write().await;

        if policies.contains_key(&policy.id) || policies.values().any(|p| p.role == policy.role) {
            return Err(DbError::Constraint(format!(
                "Policy for role '{}' already exists",
                policy.role
            )));
        }

        policies.insert(policy.id.clone(), policy.clone());
        Ok(policy.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Policy>, DbError> {
        let policies = self.policies.read().await;
        Ok(policies.get(id).cloned())
    }

    async fn get_by_role(&self, role: &str) -> Result<Option<Policy>, DbError> {
        let policies = self.policies.read().await;
        Ok(policies.values().find(|p| p.role == role).cloned())
    }

    async fn update(&self, id: &str, update: &PolicyUpdate) -> Result<Policy, DbError> {
        let mut policies = self.policies.write().await;

        let policy = policies.get_mut(id).ok_or_else(|| DbError::NotFound {
            entity: "Policy".to_string(),
            id: id.to_string(),
        })?;

        if let Some(priority) = update.priority {
            policy.priority = priority;
        }
        if let Some(description) = &update.description {
            policy.description = description.clone();
        }
        policy.updated_at = Utc::now();

        Ok(policy.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool, DbError> {
        let mut policies = self.policies.write().await;
        Ok(policies.remove(id).is_some())
    }

    async fn query_ids(&self, query: &PolicyQuery) -> Result<Vec<String>, DbError> {
        let policies = self.policies.read().await;

        let mut matched: Vec<&Policy> = policies.values().filter(|p| query.matches(p)).collect();
        matched.sort_by(|a, b| query.compare(a, b));

        Ok(matched.into_iter().map(|p| p.id.clone()).collect())
    }
}
