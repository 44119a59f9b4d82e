//! User password state administration.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::put,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::dto::PasswordStateRequest;
use crate::error::ApiError;
use crate::state::AppState;

/// Creates user routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/:id/password-state", put(set_password_state))
}

/// Flags a user for a forced password change, or lifts the flag.
async fn set_password_state(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<PasswordStateRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .users
        .set_password_change_required(id, request.password_change_required)
        .await?;

    info!(
        admin_id = %admin.id,
        user_id = %id,
        password_change_required = request.password_change_required,
        "User password state changed"
    );
    Ok(StatusCode::NO_CONTENT)
}
