//! Health check endpoint integration tests.

use axum::http::StatusCode;
use serde_json::Value;

use super::common::{
    create_test_app, create_test_router, get_request, locked_user, send_request, with_cookie,
};

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_test_router();

    let (status, body): (StatusCode, Value) = send_request(app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body.get("version").is_some());
}

/// The lock allow-list is exact; health checks are not on it.
#[tokio::test]
async fn test_health_is_locked_for_expired_password() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app.send(with_cookie(get_request("/health"), &cookie)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_health_without_session() {
    let app = create_test_app(vec![]);

    let response = app.send(get_request("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
}
