//! Navigation lock for users whose password must be changed.
//!
//! Every request from a user flagged with `password_change_required` is
//! checked against an allow-list (the password-change page, logout, and any
//! paths contributed by [`AllowedPathProvider`]s). Anything else is answered
//! with a `302 Found` to the password-change page. A reset token arriving in
//! the query string is carried onto the redirect and remembered in the
//! session so that it survives the rest of the redirect chain.
//!
//! The lock keeps no state of its own. The flag is re-read on every request,
//! so the first request after the flag clears passes through.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::auth::{load_current_user, ResetTokenSlot};
use crate::routing::{with_query, RouteError, RouteTable, LOGOUT_ROUTE, PASSWORD_CHANGE_ROUTE};
use crate::state::AppState;

/// Query parameter carrying a password reset token.
pub const DEFAULT_TOKEN_QUERY_PARAM: &str = "pass-reset-token";

/// Counter of redirects issued by the lock, labelled by message.
pub const REDIRECTS_METRIC: &str = "navigation_lock_redirects_total";

/// Settings for the navigation lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationLockConfig {
    /// Route name of the password-change page.
    pub password_change_route: String,
    /// Route name of the logout endpoint.
    pub logout_route: String,
    /// Query parameter holding the reset token.
    pub token_query_param: String,
}

impl Default for NavigationLockConfig {
    fn default() -> Self {
        Self {
            password_change_route: PASSWORD_CHANGE_ROUTE.to_string(),
            logout_route: LOGOUT_ROUTE.to_string(),
            token_query_param: DEFAULT_TOKEN_QUERY_PARAM.to_string(),
        }
    }
}

/// Contributes extra paths a locked user may visit.
///
/// Providers are consulted on every locked request and can only add paths.
pub trait AllowedPathProvider: Send + Sync {
    fn allowed_paths(&self, routes: &RouteTable) -> Vec<String>;
}

impl<F> AllowedPathProvider for F
where
    F: Fn(&RouteTable) -> Vec<String> + Send + Sync,
{
    fn allowed_paths(&self, routes: &RouteTable) -> Vec<String> {
        self(routes)
    }
}

/// Provider returning a fixed list of paths.
#[derive(Debug, Clone, Default)]
pub struct StaticAllowedPaths(pub Vec<String>);

impl AllowedPathProvider for StaticAllowedPaths {
    fn allowed_paths(&self, _routes: &RouteTable) -> Vec<String> {
        self.0.clone()
    }
}

/// Message shown to a user who is redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMessage {
    /// A reset token is in flight.
    ResetPending,
    /// No token anywhere; the password simply expired.
    PasswordExpired,
}

impl LockMessage {
    pub fn text(&self) -> &'static str {
        match self {
            LockMessage::ResetPending => "You need to change your password before continuing.",
            LockMessage::PasswordExpired => {
                "Your password has expired and must be changed before continuing."
            }
        }
    }

    /// Metric label.
    pub fn as_label(&self) -> &'static str {
        match self {
            LockMessage::ResetPending => "reset_pending",
            LockMessage::PasswordExpired => "password_expired",
        }
    }
}

/// Redirect issued to a locked user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRedirect {
    /// Target path, including the token query when present.
    pub location: String,
    pub message: LockMessage,
    /// Token taken from the request that must be saved to the session.
    pub token_to_store: Option<String>,
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    Pass,
    Redirect(LockRedirect),
}

/// Decides whether a request may proceed.
#[derive(Clone)]
pub struct NavigationLock {
    routes: Arc<RouteTable>,
    config: NavigationLockConfig,
    password_change_path: String,
    logout_path: String,
    providers: Vec<Arc<dyn AllowedPathProvider>>,
}

impl std::fmt::Debug for NavigationLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationLock")
            .field("config", &self.config)
            .field("password_change_path", &self.password_change_path)
            .field("logout_path", &self.logout_path)
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl NavigationLock {
    /// Creates a lock, resolving both configured routes up front.
    pub fn new(
        routes: Arc<RouteTable>,
        config: NavigationLockConfig,
    ) -> Result<Self, RouteError> {
        let password_change_path = routes.path(&config.password_change_route)?.to_string();
        let logout_path = routes.path(&config.logout_route)?.to_string();

        Ok(Self {
            routes,
            config,
            password_change_path,
            logout_path,
            providers: Vec::new(),
        })
    }

    /// Creates a lock over the default routes and settings.
    pub fn with_defaults() -> Result<Self, RouteError> {
        Self::new(
            Arc::new(RouteTable::default()),
            NavigationLockConfig::default(),
        )
    }

    /// Registers an allow-list provider.
    pub fn with_provider(mut self, provider: impl AllowedPathProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn config(&self) -> &NavigationLockConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Path of the password-change page.
    pub fn password_change_path(&self) -> &str {
        &self.password_change_path
    }

    /// Path of the logout endpoint.
    pub fn logout_path(&self) -> &str {
        &self.logout_path
    }

    /// Paths a locked user may visit.
    pub fn allowed_paths(&self) -> Vec<String> {
        let mut paths = vec![self.password_change_path.clone(), self.logout_path.clone()];
        for provider in &self.providers {
            paths.extend(provider.allowed_paths(&self.routes));
        }
        paths
    }

    /// Exact match of `path` against the allow-list.
    pub fn is_allowed(&self, path: &str) -> bool {
        path == self.password_change_path
            || path == self.logout_path
            || self
                .providers
                .iter()
                .any(|p| p.allowed_paths(&self.routes).iter().any(|a| a == path))
    }

    /// Extracts the reset token from a raw query string.
    ///
    /// A present but empty parameter yields `Some("")`.
    pub fn token_from_query(&self, query: Option<&str>) -> Option<String> {
        let query = query?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == self.config.token_query_param.as_str())
            .map(|(_, value)| value.into_owned())
    }

    /// Builds the redirect for a locked user heading somewhere not allowed.
    ///
    /// A token in the request wins over the stored one and is marked for
    /// storage.
    pub fn redirect(
        &self,
        query_token: Option<String>,
        stored_token: Option<String>,
    ) -> LockRedirect {
        let (token, token_to_store) = match (query_token, stored_token) {
            (Some(token), _) => (Some(token.clone()), Some(token)),
            (None, Some(stored)) => (Some(stored), None),
            (None, None) => (None, None),
        };

        match token {
            Some(token) => LockRedirect {
                location: with_query(
                    &self.password_change_path,
                    &[(self.config.token_query_param.as_str(), token.as_str())],
                ),
                message: LockMessage::ResetPending,
                token_to_store,
            },
            None => LockRedirect {
                location: self.password_change_path.clone(),
                message: LockMessage::PasswordExpired,
                token_to_store: None,
            },
        }
    }

    /// Evaluates a request without touching the session.
    pub fn evaluate(
        &self,
        password_change_required: bool,
        path: &str,
        query: Option<&str>,
        stored_token: Option<String>,
    ) -> LockDecision {
        if !password_change_required || self.is_allowed(path) {
            return LockDecision::Pass;
        }
        LockDecision::Redirect(self.redirect(self.token_from_query(query), stored_token))
    }
}

/// Axum middleware enforcing the navigation lock.
///
/// Must run inside the session layer.
pub async fn navigation_lock(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let user = match load_current_user(state.users.as_ref(), &session).await {
        Ok(Some(user)) => user,
        Ok(None) => return next.run(request).await,
        Err(e) => {
            error!(error = %e, "Failed to load user for navigation lock");
            return next.run(request).await;
        }
    };

    let lock = &state.navigation_lock;
    let path = request.uri().path();
    let query = request.uri().query();
    let slot = ResetTokenSlot::new(&session);

    // The stored token only matters when the request carries none.
    let stored_token = if user.password_change_required && lock.token_from_query(query).is_none()
    {
        slot.get().await
    } else {
        None
    };

    let redirect = match lock.evaluate(user.password_change_required, path, query, stored_token) {
        LockDecision::Pass => {
            if user.password_change_required {
                debug!(user_id = %user.id, path = %path, "Locked user on allowed path");
            }
            return next.run(request).await;
        }
        LockDecision::Redirect(redirect) => redirect,
    };

    if let Some(token) = &redirect.token_to_store {
        if let Err(e) = slot.set(token).await {
            warn!(user_id = %user.id, error = %e, "Failed to store reset token in session");
        }
    }

    state
        .messenger
        .add_error(&session, redirect.message.text())
        .await;

    metrics::counter!(REDIRECTS_METRIC, "reason" => redirect.message.as_label()).increment(1);
    info!(
        user_id = %user.id,
        path = %path,
        reason = redirect.message.as_label(),
        "Redirecting locked user to password change"
    );

    (StatusCode::FOUND, [(header::LOCATION, redirect.location)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock() -> NavigationLock {
        NavigationLock::with_defaults().unwrap()
    }

    #[test]
    fn test_allowed_paths_include_change_and_logout() {
        let lock = lock().with_provider(StaticAllowedPaths(vec!["/help".to_string()]));

        assert_eq!(
            lock.allowed_paths(),
            vec!["/user/password/change", "/user/logout", "/help"]
        );
        assert!(lock.is_allowed("/help"));
        assert!(!lock.is_allowed("/help/more"));
        assert!(!lock.is_allowed("/user/password/change/extra"));
    }

    #[test]
    fn test_closure_provider_can_resolve_routes() {
        let routes = Arc::new(
            RouteTable::default()
                .with_route("contact", "/contact")
                .unwrap(),
        );
        let lock = NavigationLock::new(routes, NavigationLockConfig::default())
            .unwrap()
            .with_provider(|routes: &RouteTable| {
                routes
                    .path("contact")
                    .map(|p| vec![p.to_string()])
                    .unwrap_or_default()
            });

        assert!(lock.is_allowed("/contact"));
    }

    #[test]
    fn test_new_rejects_unknown_route() {
        let config = NavigationLockConfig {
            password_change_route: "nowhere".to_string(),
            ..Default::default()
        };
        let result = NavigationLock::new(Arc::new(RouteTable::default()), config);
        assert!(matches!(result, Err(RouteError::UnknownRoute(_))));
    }

    #[test]
    fn test_token_from_query() {
        let lock = lock();

        assert_eq!(
            lock.token_from_query(Some("a=1&pass-reset-token=XYZ")),
            Some("XYZ".to_string())
        );
        assert_eq!(
            lock.token_from_query(Some("pass-reset-token=")),
            Some(String::new())
        );
        assert_eq!(lock.token_from_query(Some("other=1")), None);
        assert_eq!(lock.token_from_query(None), None);
    }

    #[test]
    fn test_evaluate_unlocked_user_always_passes() {
        let lock = lock();
        assert_eq!(
            lock.evaluate(false, "/some/other/page", Some("pass-reset-token=XYZ"), None),
            LockDecision::Pass
        );
    }

    #[test]
    fn test_evaluate_allowed_path_passes() {
        let lock = lock();
        assert_eq!(
            lock.evaluate(true, "/user/password/change", None, None),
            LockDecision::Pass
        );
        assert_eq!(lock.evaluate(true, "/user/logout", None, None), LockDecision::Pass);
    }

    #[test]
    fn test_evaluate_query_token_wins_and_is_stored() {
        let lock = lock();
        let decision = lock.evaluate(
            true,
            "/some/other/page",
            Some("pass-reset-token=XYZ"),
            Some("OLD".to_string()),
        );

        assert_eq!(
            decision,
            LockDecision::Redirect(LockRedirect {
                location: "/user/password/change?pass-reset-token=XYZ".to_string(),
                message: LockMessage::ResetPending,
                token_to_store: Some("XYZ".to_string()),
            })
        );
    }

    #[test]
    fn test_evaluate_falls_back_to_stored_token() {
        let lock = lock();
        let decision = lock.evaluate(true, "/some/other/page", None, Some("ABC".to_string()));

        assert_eq!(
            decision,
            LockDecision::Redirect(LockRedirect {
                location: "/user/password/change?pass-reset-token=ABC".to_string(),
                message: LockMessage::ResetPending,
                token_to_store: None,
            })
        );
    }

    #[test]
    fn test_evaluate_without_token_reports_expiry() {
        let lock = lock();
        let decision = lock.evaluate(true, "/some/other/page", None, None);

        assert_eq!(
            decision,
            LockDecision::Redirect(LockRedirect {
                location: "/user/password/change".to_string(),
                message: LockMessage::PasswordExpired,
                token_to_store: None,
            })
        );
    }
}
