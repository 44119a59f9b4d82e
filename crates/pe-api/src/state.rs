//! Application state shared across handlers.

use pe_core::db::mocks::{MockConstraintRepository, MockPolicyRepository, MockUserRepository};
use pe_core::db::UserRepository;
use pe_core::{PolicyResolver, PolicyStore};
use std::sync::Arc;
use tracing::info;

use crate::messages::{Messenger, SessionMessenger};
use crate::middleware::NavigationLock;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Policy persistence with constraint cascade.
    pub policy_store: Arc<PolicyStore>,
    /// Governing-policy selection over the store.
    pub resolver: Arc<PolicyResolver>,
    /// User password state.
    pub users: Arc<dyn UserRepository>,
    /// Allow-list and redirect rules for locked users.
    pub navigation_lock: Arc<NavigationLock>,
    /// Channel for user-facing messages.
    pub messenger: Arc<dyn Messenger>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        policy_store: PolicyStore,
        users: Arc<dyn UserRepository>,
        navigation_lock: NavigationLock,
    ) -> Self {
        let policy_store = Arc::new(policy_store);
        info!(
            allowed_paths = navigation_lock.allowed_paths().len(),
            "Navigation lock initialized"
        );

        Self {
            resolver: Arc::new(PolicyResolver::new(policy_store.clone())),
            policy_store,
            users,
            navigation_lock: Arc::new(navigation_lock),
            messenger: Arc::new(SessionMessenger),
        }
    }

    /// Creates a state backed by in-memory repositories.
    pub fn in_memory(users: Arc<MockUserRepository>, navigation_lock: NavigationLock) -> Self {
        let store = PolicyStore::new(
            Arc::new(MockPolicyRepository::new()),
            Arc::new(MockConstraintRepository::new()),
        );
        Self::new(store, users, navigation_lock)
    }

    /// Creates a state backed by a database pool.
    #[cfg(feature = "database")]
    pub fn from_pool(pool: &pe_core::db::DbPool, navigation_lock: NavigationLock) -> Self {
        use pe_core::db::{
            create_constraint_repository, create_policy_repository, create_user_repository,
            SqlCascadeBoundary,
        };

        let store = PolicyStore::new(
            Arc::from(create_policy_repository(pool)),
            Arc::from(create_constraint_repository(pool)),
        )
        .with_cascade_boundary(Arc::new(SqlCascadeBoundary::new(pool.clone())));

        Self::new(store, Arc::from(create_user_repository(pool)), navigation_lock)
    }

    /// Replaces the messenger.
    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = messenger;
        self
    }
}
