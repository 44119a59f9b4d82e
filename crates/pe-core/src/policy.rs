//! Password policy data models.
//!
//! A [`Policy`] binds a set of password [`Constraint`]s to a single role and
//! carries a priority used to pick the governing policy for users that hold
//! several qualifying roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Sort direction for priority-ranked policy queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOrder {
    /// Lowest priority first.
    Asc,
    /// Highest priority first.
    #[default]
    Desc,
}

impl QueryOrder {
    /// Returns the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            QueryOrder::Asc => "ASC",
            QueryOrder::Desc => "DESC",
        }
    }

    /// Returns the keyword for the id tie-break column.
    ///
    /// The tie-break runs opposite to the priority direction so that an
    /// ascending listing is the exact reverse of a descending one.
    pub fn tie_break_sql(&self) -> &'static str {
        match self {
            QueryOrder::Asc => "DESC",
            QueryOrder::Desc => "ASC",
        }
    }
}

impl std::fmt::Display for QueryOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryOrder::Asc => write!(f, "asc"),
            QueryOrder::Desc => write!(f, "desc"),
        }
    }
}

impl std::str::FromStr for QueryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(QueryOrder::Asc),
            "desc" => Ok(QueryOrder::Desc),
            other => Err(format!("Invalid query order: {}", other)),
        }
    }
}

/// A password policy bound to exactly one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Identifier, always equal to `role`.
    pub id: String,
    /// The role this policy governs.
    pub role: String,
    /// Higher values take precedence over lower ones.
    pub priority: i32,
    /// Optional administrative description.
    pub description: Option<String>,
    /// Timestamp when the policy was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update.
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    /// Creates a new policy for `role`, deriving the id from it.
    pub fn new(role: impl Into<String>, priority: i32) -> Self {
        let role = role.into();
        let now = Utc::now();
        Self {
            id: role.clone(),
            role,
            priority,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description for the policy.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Input for creating a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPolicy {
    pub role: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPolicy {
    pub fn new(role: impl Into<String>, priority: i32) -> Self {
        Self {
            role: role.into(),
            priority,
            description: None,
        }
    }
}

/// Partial update for a policy. The role is immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyUpdate {
    pub priority: Option<i32>,
    pub description: Option<Option<String>>,
}

/// An individual password rule owned by a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Opaque identifier.
    pub id: Uuid,
    /// Id of the owning policy.
    pub policy: String,
    /// Rule plugin name, e.g. `minimum_characters`.
    pub kind: String,
    /// Rule-specific settings.
    pub settings: serde_json::Value,
    /// Timestamp when the constraint was created.
    pub created_at: DateTime<Utc>,
}

impl Constraint {
    /// Creates a new constraint for the given policy.
    pub fn new(policy: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy: policy.into(),
            kind: kind.into(),
            settings: serde_json::Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    /// Sets the rule settings.
    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }
}

/// Input for creating a constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConstraint {
    pub policy: String,
    pub kind: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Role filter plus priority ordering, the only query shape the resolver needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyQuery {
    /// `None` selects every policy; `Some(vec![])` selects none.
    pub roles: Option<Vec<String>>,
    pub order: QueryOrder,
}

impl PolicyQuery {
    pub fn new(roles: Option<&[String]>, order: QueryOrder) -> Self {
        Self {
            roles: roles.map(|r| r.to_vec()),
            order,
        }
    }

    /// Returns true if the query can never match anything.
    pub fn is_empty_selection(&self) -> bool {
        matches!(&self.roles, Some(roles) if roles.is_empty())
    }

    /// Returns true if the policy satisfies the role condition.
    pub fn matches(&self, policy: &Policy) -> bool {
        match &self.roles {
            Some(roles) => roles.iter().any(|r| r == &policy.role),
            None => true,
        }
    }

    /// Orders two policies the way every backend must.
    ///
    /// `Desc` sorts by priority descending then id ascending; `Asc` is the
    /// exact reverse of that.
    pub fn compare(&self, a: &Policy, b: &Policy) -> Ordering {
        let desc = b
            .priority
            .cmp(&a.priority)
            .then_with(|| a.id.cmp(&b.id));
        match self.order {
            QueryOrder::Desc => desc,
            QueryOrder::Asc => desc.reverse(),
        }
    }
}
