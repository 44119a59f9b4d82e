//! User password state as seen by the policy layer.
//!
//! Users are owned by the identity provider. This crate only reads the
//! roles and the `password_change_required` flag, and stores the minimal
//! [`SessionData`] the provider places in an authenticated session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role that may administer password policies.
pub const ADMIN_ROLE: &str = "administrator";

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Role identifiers held by the user.
    pub roles: Vec<String>,
    /// Set when the user must change their password before navigating.
    pub password_change_required: bool,
    /// Timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with the given roles.
    pub fn new(username: impl Into<String>, roles: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            roles,
            password_change_required: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the user as having to change their password.
    pub fn with_password_change_required(mut self, required: bool) -> Self {
        self.password_change_required = required;
        self
    }

    /// Returns true if the user holds the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns true if the user may administer policies.
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Data stored in an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
}

impl SessionData {
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}
