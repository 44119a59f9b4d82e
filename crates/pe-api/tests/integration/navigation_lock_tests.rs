//! Navigation lock integration tests.

use axum::http::StatusCode;
use pe_api::middleware::REDIRECTS_METRIC;
use pe_core::db::UserRepository;
use pe_core::User;
use serde_json::Value;

use super::common::{
    create_test_app, get_request, location, locked_user, post_request, with_cookie,
};

const CHANGE_PATH: &str = "/user/password/change";
const EXPIRED: &str = "Your password has expired and must be changed before continuing.";
const RESET_PENDING: &str = "You need to change your password before continuing.";

fn message_texts(body: &Value) -> Vec<String> {
    body["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m["text"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_unlocked_user_passes_through() {
    let user = User::new("jdoe", vec!["editor".to_string()]);
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request("/api/messages"), &cookie))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(message_texts(&body).is_empty());
}

#[tokio::test]
async fn test_anonymous_request_passes_through() {
    let app = create_test_app(vec![]);

    let response = app.send(get_request("/api/messages")).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_locked_user_redirected_with_expiry_message() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(get_request("/api/messages"), &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(CHANGE_PATH));

    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request(CHANGE_PATH), &cookie))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["password_change_required"], true);
    assert_eq!(body["reset_token_pending"], false);
    assert_eq!(message_texts(&body), vec![EXPIRED.to_string()]);
    assert_eq!(body["messages"][0]["level"], "error");
}

#[tokio::test]
async fn test_locked_user_may_visit_password_change() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(get_request(CHANGE_PATH), &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_locked_user_may_log_out() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(post_request("/user/logout"), &cookie))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logged_out"], true);

    // The session is gone, so the lock no longer applies.
    let response = app
        .send(with_cookie(get_request("/api/messages"), &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_allow_list_is_exact() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(get_request("/user/password/change/"), &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(CHANGE_PATH));
}

#[tokio::test]
async fn test_query_token_is_carried_and_stored() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(
            get_request("/api/policies?pass-reset-token=abc123"),
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        Some("/user/password/change?pass-reset-token=abc123")
    );

    // A later request without the token is redirected with the stored one.
    let response = app
        .send(with_cookie(get_request("/api/messages"), &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        Some("/user/password/change?pass-reset-token=abc123")
    );

    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request(CHANGE_PATH), &cookie))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reset_token_pending"], true);
    assert_eq!(
        message_texts(&body),
        vec![RESET_PENDING.to_string(), RESET_PENDING.to_string()]
    );
}

#[tokio::test]
async fn test_newer_query_token_replaces_stored_token() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    app.send(with_cookie(
        get_request("/health?pass-reset-token=first"),
        &cookie,
    ))
    .await;
    app.send(with_cookie(
        get_request("/health?pass-reset-token=second"),
        &cookie,
    ))
    .await;

    let response = app.send(with_cookie(get_request("/health"), &cookie)).await;

    assert_eq!(
        location(&response),
        Some("/user/password/change?pass-reset-token=second")
    );
}

#[tokio::test]
async fn test_token_on_allowed_path_is_not_stored() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(
            get_request("/user/password/change?pass-reset-token=abc123"),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(with_cookie(get_request("/api/messages"), &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(CHANGE_PATH));
}

#[tokio::test]
async fn test_token_is_url_encoded_in_redirect() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(
            get_request("/health?pass-reset-token=a%20b%26c"),
            &cookie,
        ))
        .await;

    assert_eq!(
        location(&response),
        Some("/user/password/change?pass-reset-token=a+b%26c")
    );
}

#[tokio::test]
async fn test_empty_token_counts_as_present() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(get_request("/health?pass-reset-token="), &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        Some("/user/password/change?pass-reset-token=")
    );

    let (_, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request(CHANGE_PATH), &cookie))
        .await;
    assert_eq!(message_texts(&body), vec![RESET_PENDING.to_string()]);
}

#[tokio::test]
async fn test_clearing_flag_lifts_lock() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let response = app
        .send(with_cookie(
            get_request("/health?pass-reset-token=abc"),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    app.users
        .set_password_change_required(user.id, false)
        .await
        .unwrap();

    let response = app.send(with_cookie(get_request("/health"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // A satisfied user visiting the change page loses the leftover token.
    let (_, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request(CHANGE_PATH), &cookie))
        .await;
    assert_eq!(body["password_change_required"], false);
    assert_eq!(body["reset_token_pending"], false);

    app.users
        .set_password_change_required(user.id, true)
        .await
        .unwrap();

    let response = app.send(with_cookie(get_request("/health"), &cookie)).await;
    assert_eq!(location(&response), Some(CHANGE_PATH));
}

#[tokio::test]
async fn test_user_lookup_failure_passes_through() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    app.users.fail_get(true);

    let response = app.send(with_cookie(get_request("/health"), &cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_session_user_passes_through() {
    let user = locked_user();
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    app.users.clear().await;

    let response = app.send(with_cookie(get_request("/health"), &cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_redirect_metric_name() {
    assert_eq!(REDIRECTS_METRIC, "navigation_lock_redirects_total");
}
