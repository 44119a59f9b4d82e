//! Axum extractors for authentication and authorization.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use pe_core::User;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

use super::load_current_user;

/// Extractor for authenticated users.
///
/// Loads the user referenced by the session from the user repository so
/// that roles and the password flag are always current. Returns 401
/// Unauthorized if the session carries no user.
///
/// # Example
///
/// ```ignore
/// async fn protected_endpoint(
///     AuthenticatedUser(user): AuthenticatedUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthorized("Session unavailable".to_string()))?;

        match load_current_user(app_state.users.as_ref(), &session).await? {
            Some(user) => Ok(AuthenticatedUser(user)),
            None => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }
}

/// Extractor for optional authentication.
///
/// Never fails. Returns `None` if not authenticated or if the user could
/// not be loaded.
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let Ok(session) = Session::from_request_parts(parts, state).await else {
            return Ok(OptionalUser(None));
        };

        match load_current_user(app_state.users.as_ref(), &session).await {
            Ok(user) => Ok(OptionalUser(user)),
            Err(e) => {
                warn!(error = %e, "Failed to load session user");
                Ok(OptionalUser(None))
            }
        }
    }
}

/// Extractor that requires the administrator role.
///
/// Returns 403 Forbidden if the user is not an administrator.
pub struct RequireAdmin(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            debug!(user_id = %user.id, "Policy administration denied");
            return Err(ApiError::Forbidden(
                "Administrator role required".to_string(),
            ));
        }

        Ok(RequireAdmin(user))
    }
}
