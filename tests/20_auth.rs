mod common;

use axum::http::StatusCode;
use common::{auth_token, get, get_auth, post_json, send, test_app, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn login_returns_token_and_profile() {
    let (app, _state) = test_app();

    let body = json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD });
    let (status, body) = send(&app, post_json("/api/auth/login", None, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["user"]["email"], ADMIN_EMAIL);
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (app, _state) = test_app();

    let body = json!({ "email": ADMIN_EMAIL, "password": "nope" });
    let (status, body) = send(&app, post_json("/api/auth/login", None, &body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn login_rejects_unknown_email_with_the_same_error() {
    let (app, _state) = test_app();

    let body = json!({ "email": "ghost@example.com", "password": ADMIN_PASSWORD });
    let (status, body) = send(&app, post_json("/api/auth/login", None, &body)).await;

    // Indistinguishable from a bad password, so emails cannot be enumerated
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn login_requires_both_fields() {
    let (app, _state) = test_app();

    let body = json!({ "email": "", "password": "" });
    let (status, _) = send(&app, post_json("/api/auth/login", None, &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let (app, _state) = test_app();

    let (status, body) = send(&app, get("/api/apps")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn tampered_tokens_are_rejected() {
    let (app, state) = test_app();

    let mut token = auth_token(&state);
    token.push('x');
    let (status, _) = send(&app, get_auth("/api/auth/me", &token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_authenticated_admin() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (status, body) = send(&app, get_auth("/api/auth/me", &token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "admin");
}
