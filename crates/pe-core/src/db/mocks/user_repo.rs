//! Mock implementation of UserRepository for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::User;
use crate::db::{DbError, UserRepository};

/// Mock implementation of UserRepository using in-memory storage.
pub struct MockUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    fail_get: AtomicBool,
}

impl Default for MockUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUserRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            fail_get: AtomicBool::new(false),
        }
    }

    /// Creates a mock repository pre-populated with users.
    pub fn with_users(users: Vec<User>) -> Self {
        let map: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Arc::new(RwLock::new(map)),
            fail_get: AtomicBool::new(false),
        }
    }

    /// Makes `get` fail until reset.
    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    /// Gets a snapshot of all users in the mock.
    pub async fn snapshot(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }

    /// Clears all users from the mock.
    pub async fn clear(&self) {
        self.users.write().await.clear();
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(DbError::Constraint(format!(
                "User with username '{}' already exists",
                user.username
            )));
        }

        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(DbError::Connection("injected lookup failure".to_string()));
        }

        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn set_password_change_required(
        &self,
        id: Uuid,
        required: bool,
    ) -> Result<(), DbError> {
        let mut users = self.users.write().await;

        let user = users.get_mut(&id).ok_or_else(|| DbError::NotFound {
            entity: "User".to_string(),
            id: id.to_string(),
        })?;
        user.password_change_required = required;
        user.updated_at = Utc::now();
        Ok(())
    }
}
