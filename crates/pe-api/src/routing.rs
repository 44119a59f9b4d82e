//! Logical route names resolved to absolute paths.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use url::form_urlencoded;

/// Route name of the password-change page.
pub const PASSWORD_CHANGE_ROUTE: &str = "password.change";
/// Route name of the logout endpoint.
pub const LOGOUT_ROUTE: &str = "user.logout";

/// Errors raised while resolving routes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Route '{name}' has invalid path '{path}': paths must be absolute")]
    InvalidPath { name: String, path: String },
}

/// Maps logical route names to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: HashMap<String, String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let mut routes = HashMap::new();
        routes.insert(
            PASSWORD_CHANGE_ROUTE.to_string(),
            "/user/password/change".to_string(),
        );
        routes.insert(LOGOUT_ROUTE.to_string(), "/user/logout".to_string());
        Self { routes }
    }
}

impl RouteTable {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Adds or replaces a route.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<(), RouteError> {
        let name = name.into();
        let path = path.into();
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath { name, path });
        }
        self.routes.insert(name, path);
        Ok(())
    }

    /// Builder form of [`RouteTable::insert`].
    pub fn with_route(
        mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Self, RouteError> {
        self.insert(name, path)?;
        Ok(self)
    }

    /// Overlays configured routes on top of the defaults.
    pub fn from_overrides(overrides: &HashMap<String, String>) -> Result<Self, RouteError> {
        let mut table = Self::default();
        for (name, path) in overrides {
            table.insert(name.clone(), path.clone())?;
        }
        Ok(table)
    }

    /// Resolves a route name to its path.
    pub fn path(&self, name: &str) -> Result<&str, RouteError> {
        self.routes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))
    }

    /// Resolves a route name to a path with an encoded query string.
    pub fn url(&self, name: &str, query: &[(&str, &str)]) -> Result<String, RouteError> {
        Ok(with_query(self.path(name)?, query))
    }
}

/// Appends `query` to `path`. An empty slice leaves the path unchanged.
pub fn with_query(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    format!("{}?{}", path, encoded)
}
