use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, tenant_selector_middleware};
use crate::state::AppState;

/// Assemble the full application router.
///
/// Three tiers: public (health, login), protected (JWT), and app-scoped
/// (JWT plus tenant resolution). The tenant hook establishes the database
/// connection before any app-scoped handler runs.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(public::health::health))
        .route("/api/auth/login", post(public::auth::login));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(protected::auth::me))
        .route("/api/apps", get(protected::apps::list))
        .route(
            "/api/metrics/aggregate/dashboard",
            get(protected::aggregate::dashboard),
        )
        .route(
            "/api/metrics/aggregate/users-over-time",
            get(protected::aggregate::users_over_time),
        )
        .route(
            "/api/metrics/aggregate/top-shops",
            get(protected::aggregate::top_shops),
        )
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let app_scoped = Router::new()
        .route("/users", get(protected::users::list))
        .route("/users/stats", get(protected::users::stats))
        .route("/users/shops", get(protected::users::shops))
        .route("/users/:id", get(protected::users::get).patch(protected::users::update))
        .route("/users/:id/status", patch(protected::users::update_status))
        .route(
            "/templates",
            get(protected::templates::list).post(protected::templates::create),
        )
        .route("/templates/categories", get(protected::templates::categories))
        .route(
            "/templates/:id",
            get(protected::templates::get)
                .patch(protected::templates::update)
                .delete(protected::templates::delete),
        )
        .route("/templates/:id/active", patch(protected::templates::toggle_active))
        .route("/templates/:id/duplicate", post(protected::templates::duplicate))
        .route("/metrics/dashboard", get(protected::metrics::dashboard))
        .route("/metrics/users-over-time", get(protected::metrics::users_over_time))
        .route("/metrics/top-shops", get(protected::metrics::top_shops))
        .route("/metrics/recent-activity", get(protected::metrics::recent_activity))
        .route("/metrics/events", get(protected::metrics::events))
        // Layer order: tenant resolution runs inside auth, so unauthenticated
        // requests are rejected before any connection is attempted.
        .layer(from_fn_with_state(state.clone(), tenant_selector_middleware))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest("/api/apps/:app_id", app_scoped)
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}
