//! Policy administration endpoint tests.

use axum::http::StatusCode;
use pe_core::User;
use serde_json::{json, Value};

use super::common::{
    admin_user, create_test_app, delete_request, get_request, post_json_request,
    put_json_request, with_cookie, TestApp,
};

async fn create_policy(app: &TestApp, cookie: &str, role: &str, priority: i32) -> Value {
    let body = json!({ "role": role, "priority": priority }).to_string();
    let (status, policy): (StatusCode, Value) = app
        .send_json(with_cookie(post_json_request("/api/policies", &body), cookie))
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {policy}");
    policy
}

fn roles_of(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|p| p["role"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_policy_routes_require_login() {
    let app = create_test_app(vec![]);

    let (status, body): (StatusCode, Value) =
        app.send_json(get_request("/api/policies")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_policy_routes_require_admin() {
    let user = User::new("jdoe", vec!["editor".to_string()]);
    let app = create_test_app(vec![user.clone()]);
    let cookie = app.login(&user).await;

    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request("/api/policies"), &cookie))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_list_orders_by_priority() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    create_policy(&app, &cookie, "editor", 5).await;
    create_policy(&app, &cookie, "administrator", 10).await;
    create_policy(&app, &cookie, "viewer", 1).await;

    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request("/api/policies"), &cookie))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roles_of(&body), vec!["administrator", "editor", "viewer"]);

    let (_, body): (StatusCode, Value) = app
        .send_json(with_cookie(
            get_request("/api/policies?roles=editor,viewer&order=asc"),
            &cookie,
        ))
        .await;
    assert_eq!(roles_of(&body), vec!["viewer", "editor"]);

    let (_, body): (StatusCode, Value) = app
        .send_json(with_cookie(get_request("/api/policies?roles="), &cookie))
        .await;
    assert!(roles_of(&body).is_empty());
}

#[tokio::test]
async fn test_invalid_order_rejected() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    let response = app
        .send(with_cookie(get_request("/api/policies?order=sideways"), &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resolve_picks_highest_priority() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    create_policy(&app, &cookie, "editor", 5).await;
    create_policy(&app, &cookie, "administrator", 10).await;

    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(
            get_request("/api/policies/resolve?roles=editor,administrator"),
            &cookie,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["policy"]["role"], "administrator");

    let (_, body): (StatusCode, Value) = app
        .send_json(with_cookie(
            get_request("/api/policies/resolve?roles=guest"),
            &cookie,
        ))
        .await;
    assert!(body["policy"].is_null());
}

#[tokio::test]
async fn test_duplicate_role_conflicts() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    create_policy(&app, &cookie, "editor", 5).await;

    let body = json!({ "role": "editor", "priority": 7 }).to_string();
    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(post_json_request("/api/policies", &body), &cookie))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_create_validates_role() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    let body = json!({ "role": "", "priority": 1 }).to_string();
    let (status, body): (StatusCode, Value) = app
        .send_json(with_cookie(post_json_request("/api/policies", &body), &cookie))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_get_and_update_policy() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    let policy = create_policy(&app, &cookie, "editor", 5).await;
    let id = policy["id"].as_str().unwrap();

    let body = json!({ "priority": 50, "description": "Editors" }).to_string();
    let (status, updated): (StatusCode, Value) = app
        .send_json(with_cookie(
            put_json_request(&format!("/api/policies/{id}"), &body),
            &cookie,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["priority"], 50);
    assert_eq!(updated["description"], "Editors");

    let (status, fetched): (StatusCode, Value) = app
        .send_json(with_cookie(get_request(&format!("/api/policies/{id}")), &cookie))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["priority"], 50);

    let response = app
        .send(with_cookie(get_request("/api/policies/missing"), &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_cascades_to_constraints() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    let policy = create_policy(&app, &cookie, "editor", 5).await;
    let id = policy["id"].as_str().unwrap();
    let constraints_uri = format!("/api/policies/{id}/constraints");

    for kind in ["length", "character_types"] {
        let body = json!({ "kind": kind, "settings": { "min": 8 } }).to_string();
        let response = app
            .send(with_cookie(post_json_request(&constraints_uri, &body), &cookie))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let (_, constraints): (StatusCode, Value) = app
        .send_json(with_cookie(get_request(&constraints_uri), &cookie))
        .await;
    assert_eq!(constraints.as_array().unwrap().len(), 2);

    let (status, report): (StatusCode, Value) = app
        .send_json(with_cookie(
            delete_request(&format!("/api/policies/{id}")),
            &cookie,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["deleted"], json!([id]));
    assert_eq!(report["constraints_deleted"], 2);

    // Deleting again is a no-op.
    let (status, report): (StatusCode, Value) = app
        .send_json(with_cookie(
            delete_request(&format!("/api/policies/{id}")),
            &cookie,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["missing"], json!([id]));
    assert_eq!(report["constraints_deleted"], 0);

    let response = app
        .send(with_cookie(get_request(&constraints_uri), &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_single_constraint() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    let policy = create_policy(&app, &cookie, "editor", 5).await;
    let id = policy["id"].as_str().unwrap();
    let constraints_uri = format!("/api/policies/{id}/constraints");

    let body = json!({ "kind": "length" }).to_string();
    let (_, constraint): (StatusCode, Value) = app
        .send_json(with_cookie(post_json_request(&constraints_uri, &body), &cookie))
        .await;
    let constraint_id = constraint["id"].as_str().unwrap();

    let response = app
        .send(with_cookie(
            delete_request(&format!("{constraints_uri}/{constraint_id}")),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, constraints): (StatusCode, Value) = app
        .send_json(with_cookie(get_request(&constraints_uri), &cookie))
        .await;
    assert!(constraints.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_constraint_through_other_policy_is_not_found() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    create_policy(&app, &cookie, "editor", 5).await;
    create_policy(&app, &cookie, "administrator", 10).await;

    let body = json!({ "kind": "length" }).to_string();
    let (status, constraint): (StatusCode, Value) = app
        .send_json(with_cookie(
            post_json_request("/api/policies/administrator/constraints", &body),
            &cookie,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let constraint_id = constraint["id"].as_str().unwrap();

    let (status, error): (StatusCode, Value) = app
        .send_json(with_cookie(
            delete_request(&format!(
                "/api/policies/editor/constraints/{constraint_id}"
            )),
            &cookie,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");

    let (_, constraints): (StatusCode, Value) = app
        .send_json(with_cookie(
            get_request("/api/policies/administrator/constraints"),
            &cookie,
        ))
        .await;
    assert_eq!(constraints.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_constraint_for_unknown_policy_rejected() {
    let admin = admin_user();
    let app = create_test_app(vec![admin.clone()]);
    let cookie = app.login(&admin).await;

    let body = json!({ "kind": "length" }).to_string();
    let response = app
        .send(with_cookie(
            post_json_request("/api/policies/nope/constraints", &body),
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_sets_password_state() {
    let admin = admin_user();
    let user = User::new("jdoe", vec!["editor".to_string()]);
    let app = create_test_app(vec![admin.clone(), user.clone()]);
    let admin_cookie = app.login(&admin).await;
    let user_cookie = app.login(&user).await;

    let body = json!({ "password_change_required": true }).to_string();
    let response = app
        .send(with_cookie(
            put_json_request(&format!("/api/users/{}/password-state", user.id), &body),
            &admin_cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(with_cookie(get_request("/api/messages"), &user_cookie))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = app
        .send(with_cookie(
            put_json_request(
                &format!("/api/users/{}/password-state", uuid::Uuid::new_v4()),
                &body,
            ),
            &admin_cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
