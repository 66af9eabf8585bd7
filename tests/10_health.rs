mod common;

use axum::http::StatusCode;
use common::{get, send, test_app};

#[tokio::test]
async fn health_is_public_and_reports_database_counts() {
    let (app, _state) = test_app();

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    // Nothing has connected yet, so the process reports itself degraded
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["databases"]["total"], 3);
    assert_eq!(body["databases"]["connected"], 0);
    assert_eq!(body["databases"]["failed"], 3);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn health_lists_every_app_with_its_connection_state() {
    let (app, _state) = test_app();

    let (_, body) = send(&app, get("/health")).await;

    let apps = body["apps"].as_object().expect("apps map");
    assert_eq!(apps.len(), 3);
    assert_eq!(apps["shop-a"], "disconnected");
    assert_eq!(apps["shop-b"], "disconnected");
    assert_eq!(apps["no-db"], "disconnected");
}

#[tokio::test]
async fn health_is_not_wrapped_in_the_response_envelope() {
    let (app, _state) = test_app();

    let (_, body) = send(&app, get("/health")).await;

    assert!(body.get("success").is_none());
    assert!(body.get("data").is_none());
}
