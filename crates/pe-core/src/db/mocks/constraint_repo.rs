//! Mock implementation of ConstraintRepository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{ConstraintRepository, DbError};
use crate::policy::Constraint;

/// Mock implementation of ConstraintRepository using in-memory storage.
///
/// Lookups and deletes can be made to fail on demand, which lets tests
/// exercise each step of a cascade delete.
pub struct MockConstraintRepository {
    constraints: Arc<RwLock<HashMap<Uuid, Constraint>>>,
    fail_list: AtomicBool,
    fail_delete: AtomicBool,
}

impl Default for MockConstraintRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConstraintRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self {
            constraints: Arc::new(RwLock::new(HashMap::new())),
            fail_list: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    /// Creates a mock repository pre-populated with constraints.
    pub fn with_constraints(constraints: Vec<Constraint>) -> Self {
        let map: HashMap<Uuid, Constraint> = constraints.into_iter().map(|c| (c.id, c)).collect();
        Self {
            constraints: Arc::new(RwLock::new(map)),
            fail_list: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    /// Makes `list_by_policy` fail until reset.
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Makes `delete_many` fail until reset.
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Gets a snapshot of all constraints in the mock.
    pub async fn snapshot(&self) -> Vec<Constraint> {
        self.constraints.read().await.values().cloned().collect()
    }

    /// Clears all constraints from the mock.
    pub async fn clear(&self) {
        self.constraints.write().await.clear();
    }
}

#[async_trait]
impl ConstraintRepository for MockConstraintRepository {
    async fn create(&self, constraint: &Constraint) -> Result<Constraint, DbError> {
        let mut constraints = self.constraints.write().await;

        if constraints.contains_key(&constraint.id) {
            return Err(DbError::Constraint(format!(
                "Constraint '{}' already exists",
                constraint.id
            )));
        }

        constraints.insert(constraint.id, constraint.clone());
        Ok(constraint.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Constraint>, DbError> {
        let constraints = self.constraints.read().await;
        Ok(constraints.get(&id).cloned())
    }

    async fn list_by_policy(&self, policy_id: &str) -> Result<Vec<Constraint>, DbError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DbError::Query("injected list failure".to_string()));
        }

        let constraints = self.constraints.read().await;
        let mut result: Vec<Constraint> = constraints
            .values()
            .filter(|c| c.policy == policy_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(result)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, DbError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DbError::Query("injected delete failure".to_string()));
        }

        let mut constraints = self.constraints.write().await;
        let removed = ids
            .iter()
            .filter(|id| constraints.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }
}
