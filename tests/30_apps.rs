mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{auth_token, get_auth, send, test_app};

#[tokio::test]
async fn lists_apps_without_connection_details() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (status, body) = send(&app, get_auth("/api/apps", &token)).await;

    assert_eq!(status, StatusCode::OK);
    let apps = body["data"].as_array().expect("apps array");
    assert_eq!(apps.len(), 3);
    // Sorted by id, and no database URL ever leaves the server
    assert_eq!(apps[0]["id"], "no-db");
    assert_eq!(apps[1]["id"], "shop-a");
    assert_eq!(apps[1]["name"], "Shop Alpha");
    for entry in apps {
        assert!(entry.get("database_url").is_none());
    }
    assert!(!body.to_string().contains("127.0.0.1"));
}

#[tokio::test]
async fn unknown_app_is_a_404() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (status, body) = send(&app, get_auth("/api/apps/ghost/users", &token)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unreachable_app_database_is_a_503() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (status, body) = send(&app, get_auth("/api/apps/shop-a/users", &token)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn app_without_database_url_is_a_500() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (status, _) = send(&app, get_auth("/api/apps/no-db/users", &token)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn header_app_id_takes_precedence_over_the_path() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let request = Request::builder()
        .method("GET")
        .uri("/api/apps/shop-a/users")
        .header("authorization", format!("Bearer {}", token))
        .header("x-app-id", "ghost")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;

    // The header names an unknown app, so the valid path segment is ignored
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn app_scoped_routes_reject_unauthenticated_requests_before_connecting() {
    let (app, state) = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/apps/shop-a/users")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // No connection attempt was made for the rejected request
    assert_eq!(state.databases.health_status().await.len(), 0);
}
