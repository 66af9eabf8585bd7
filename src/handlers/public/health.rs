use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::database::ConnectionState;
use crate::state::AppState;

/// Liveness probe plus a per-app connection snapshot. Unauthenticated and
/// outside the response envelope so load balancers can parse it directly.
/// Reports cached state only; it never touches any database.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.databases.health_status().await;
    let total = state.registry.len();
    let connected = snapshot
        .values()
        .filter(|s| **s == ConnectionState::Connected)
        .count();

    let status = if connected == total { "ok" } else { "degraded" };

    let apps: Value = state
        .registry
        .ids()
        .into_iter()
        .map(|id| {
            let conn_state = snapshot
                .get(&id)
                .copied()
                .unwrap_or(ConnectionState::Disconnected);
            (id, json!(conn_state))
        })
        .collect::<serde_json::Map<String, Value>>()
        .into();

    Json(json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "databases": {
            "total": total,
            "connected": connected,
            "failed": total - connected,
        },
        "apps": apps,
    }))
}
