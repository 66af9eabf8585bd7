mod common;

use axum::http::StatusCode;
use common::{auth_token, get_auth, send, test_app};

// Every test database here is down, so these exercise the failure-isolation
// path: the endpoints still answer 200 with error markers per app.

#[tokio::test]
async fn aggregate_dashboard_degrades_per_app_instead_of_failing() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (status, body) = send(&app, get_auth("/api/metrics/aggregate/dashboard", &token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let by_app = body["data"]["by_app"].as_array().expect("by_app");
    assert_eq!(by_app.len(), 3);
    for slice in by_app {
        assert!(slice["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert!(slice.get("data").is_none());
    }

    // With no app contributing, the merged totals are all zero
    assert_eq!(body["data"]["aggregate"]["users"]["total"], 0);
    assert_eq!(body["data"]["aggregate"]["shops"]["total"], 0);
}

#[tokio::test]
async fn aggregate_users_over_time_is_empty_when_all_apps_are_down() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (status, body) = send(
        &app,
        get_auth("/api/metrics/aggregate/users-over-time?days=7", &token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["aggregate"], serde_json::json!([]));
    assert_eq!(body["data"]["by_app"].as_array().expect("by_app").len(), 3);
}

#[tokio::test]
async fn aggregate_slices_identify_each_app() {
    let (app, state) = test_app();

    let token = auth_token(&state);
    let (_, body) = send(&app, get_auth("/api/metrics/aggregate/top-shops", &token)).await;

    let mut ids: Vec<&str> = body["data"]["by_app"]
        .as_array()
        .expect("by_app")
        .iter()
        .filter_map(|s| s["app_id"].as_str())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["no-db", "shop-a", "shop-b"]);
}

#[tokio::test]
async fn aggregate_routes_require_authentication() {
    let (app, _state) = test_app();

    let (status, _) = send(&app, common::get("/api/metrics/aggregate/dashboard")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
