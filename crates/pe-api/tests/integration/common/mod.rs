//! Common test utilities for integration tests.

use axum::{
    body::Body,
    extract::{Path, Request},
    http::{header, Method, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use pe_api::auth::set_session_data;
use pe_api::{ApiServer, AppState, NavigationLock};
use pe_core::db::mocks::MockUserRepository;
use pe_core::{SessionData, User, ADMIN_ROLE};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::Session;
use uuid::Uuid;

/// A fully layered router over in-memory repositories.
pub struct TestApp {
    pub router: Router,
    pub users: Arc<MockUserRepository>,
}

impl TestApp {
    /// Logs `user` in and returns the session cookie.
    pub async fn login(&self, user: &User) -> String {
        let response = self
            .send(post_request(&format!("/test/login/{}", user.id)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login should set a session cookie")
    }

    /// Sends a request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and parses the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: Request<Body>) -> (StatusCode, T) {
        send_request(self.router.clone(), request).await
    }
}

/// Creates an app with the given users and the default routes.
pub fn create_test_app(users: Vec<User>) -> TestApp {
    let users = Arc::new(MockUserRepository::with_users(users));
    let state = AppState::in_memory(users.clone(), NavigationLock::with_defaults().unwrap());

    let server = ApiServer::with_state(state.clone());
    let app = pe_api::routes::create_router(state).merge(test_login_routes());

    TestApp {
        router: server.layered(app),
        users,
    }
}

/// Creates a test router without the middleware stack.
pub fn create_test_router() -> Router {
    let users = Arc::new(MockUserRepository::new());
    let state = AppState::in_memory(users, NavigationLock::with_defaults().unwrap());
    pe_api::routes::create_router(state)
}

/// Stands in for the identity provider's login flow.
fn test_login_routes() -> Router {
    async fn login(session: Session, Path(id): Path<Uuid>) -> StatusCode {
        let data = SessionData {
            user_id: id,
            username: format!("user-{id}"),
        };
        match set_session_data(&session, data).await {
            Ok(()) => StatusCode::OK,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    Router::new().route("/test/login/:id", post(login))
}

/// A user holding the administrator role.
pub fn admin_user() -> User {
    User::new("admin", vec![ADMIN_ROLE.to_string()])
}

/// A user whose password has expired.
pub fn locked_user() -> User {
    User::new("locked", vec!["editor".to_string()]).with_password_change_required(true)
}

/// Extracts the `name=value` part of a Set-Cookie header.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(String::from)
}

/// Returns the Location header of a redirect.
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Adds a session cookie to a request.
pub fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

/// Helper to make GET requests.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make POST requests without a body.
pub fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make POST requests with JSON body.
pub fn post_json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make PUT requests with JSON body.
pub fn put_json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make DELETE requests.
pub fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Sends request and parses JSON response.
pub async fn send_request<T: DeserializeOwned>(
    app: Router,
    request: Request<Body>,
) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: T = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Failed to parse response: {} - Body: {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    });
    (status, parsed)
}
