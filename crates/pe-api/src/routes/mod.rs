//! API routes.

pub mod account;
pub mod health;
pub mod messages;
pub mod policies;
pub mod users;

use crate::state::AppState;
use axum::Router;

/// Creates the main router.
///
/// Account routes are mounted at the paths the route table resolves for
/// the password-change and logout route names, so the lock's allow-list
/// and the handlers can never drift apart.
pub fn create_router(state: AppState) -> Router {
    let lock = state.navigation_lock.clone();

    Router::new()
        .nest("/api", api_routes())
        .merge(health::routes())
        .merge(account::routes(&lock))
        .with_state(state)
}

/// API routes under /api prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/policies", policies::routes())
        .nest("/users", users::routes())
        .nest("/messages", messages::routes())
}
