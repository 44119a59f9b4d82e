//! Session access for the API.
//!
//! This module provides:
//! - Helpers for the user data the identity provider keeps in the session
//! - The session-scoped password reset token slot
//! - Extractors for authenticated and administrative requests

pub mod extractors;
pub mod reset_token;

pub use extractors::{AuthenticatedUser, OptionalUser, RequireAdmin};
pub use reset_token::ResetTokenSlot;

use pe_core::auth::{SessionData, User};
use pe_core::db::{DbError, UserRepository};
use tower_sessions::Session;
use tracing::warn;

/// Session key for storing user data.
pub const SESSION_USER_KEY: &str = "user";

/// Gets the session data from the session.
pub async fn get_session_data(session: &Session) -> Option<SessionData> {
    match session.get::<SessionData>(SESSION_USER_KEY).await {
        Ok(data) => data,
        Err(e) => {
            warn!(error = %e, "Failed to read session user data");
            None
        }
    }
}

/// Stores session data in the session.
pub async fn set_session_data(
    session: &Session,
    data: SessionData,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(SESSION_USER_KEY, data).await
}

/// Clears the session (logout).
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Loads the user behind the session, if any.
///
/// Returns `Ok(None)` for anonymous sessions and for sessions whose user no
/// longer exists.
pub async fn load_current_user(
    users: &dyn UserRepository,
    session: &Session,
) -> Result<Option<User>, DbError> {
    match get_session_data(session).await {
        Some(data) => users.get(data.user_id).await,
        None => Ok(None),
    }
}
