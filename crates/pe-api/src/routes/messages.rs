//! Flash message endpoint.

use axum::{routing::get, Json, Router};
use tower_sessions::Session;

use crate::dto::MessagesResponse;
use crate::messages::take_messages;
use crate::state::AppState;

/// Creates message routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(drain_messages))
}

/// Returns and clears the messages queued for this session.
async fn drain_messages(session: Session) -> Json<MessagesResponse> {
    Json(MessagesResponse {
        messages: take_messages(&session).await,
    })
}
