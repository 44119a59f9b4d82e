//! Account routes reachable while the navigation lock is active.

use axum::{
    extract::{RawQuery, State},
    routing::get,
    Json, Router,
};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::auth::{clear_session, AuthenticatedUser, OptionalUser, ResetTokenSlot};
use crate::dto::{ConstraintResponse, PasswordChangeResponse, PolicyResponse};
use crate::error::ApiError;
use crate::messages::take_messages;
use crate::middleware::NavigationLock;
use crate::state::AppState;

/// Creates the account routes at the lock's resolved paths.
pub fn routes(lock: &NavigationLock) -> Router<AppState> {
    Router::new()
        .route(lock.password_change_path(), get(password_change))
        .route(lock.logout_path(), get(logout).post(logout))
}

/// Ends the session, dropping any stored reset token with it.
async fn logout(
    OptionalUser(user): OptionalUser,
    session: Session,
) -> Result<Json<serde_json::Value>, ApiError> {
    clear_session(&session).await?;

    if let Some(user) = user {
        info!(user_id = %user.id, "User logged out");
    }

    Ok(Json(serde_json::json!({ "logged_out": true })))
}

/// Describes the policy the user's new password must satisfy.
///
/// The form itself is rendered elsewhere; this reports the governing policy,
/// its constraints, whether a reset token is in flight, and drains the
/// messages queued by the lock.
async fn password_change(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    session: Session,
    RawQuery(query): RawQuery,
) -> Result<Json<PasswordChangeResponse>, ApiError> {
    let slot = ResetTokenSlot::new(&session);

    // Satisfied users have no use for a leftover token.
    if !user.password_change_required {
        if let Err(e) = slot.clear().await {
            warn!(user_id = %user.id, error = %e, "Failed to clear reset token");
        }
    }

    let reset_token_pending = state
        .navigation_lock
        .token_from_query(query.as_deref())
        .is_some()
        || (user.password_change_required && slot.get().await.is_some());

    let policy = state.resolver.resolve_for_user(&user).await?;
    let constraints = match &policy {
        Some(policy) => state.policy_store.constraints_for(&policy.id).await?,
        None => Vec::new(),
    };

    Ok(Json(PasswordChangeResponse {
        user_id: user.id,
        username: user.username,
        password_change_required: user.password_change_required,
        reset_token_pending,
        policy: policy.map(PolicyResponse::from),
        constraints: constraints
            .into_iter()
            .map(ConstraintResponse::from)
            .collect(),
        messages: take_messages(&session).await,
    }))
}
