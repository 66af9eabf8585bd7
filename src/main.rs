use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backoffice_api::auth::AdminDirectory;
use backoffice_api::config::AppConfig;
use backoffice_api::routes::build_router;
use backoffice_api::state::AppState;
use backoffice_api::tenant::TenantRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!(environment = ?config.environment, port = config.server.port, "Starting back-office API");

    let registry = TenantRegistry::from_env();
    if registry.is_empty() {
        warn!("No apps configured; set APP_1_ID / APP_1_DATABASE_URL and friends");
    } else {
        info!(apps = registry.len(), "Loaded app registry");
    }

    let admins = AdminDirectory::from_env();
    let port = config.server.port;
    let state = AppState::new(config, registry, admins);

    // Warm up every app connection; failures are logged and retried lazily
    // on first request, so a down database never blocks startup.
    let report = state.databases.initialize_all().await;
    if report.failed > 0 {
        warn!(
            connected = report.connected,
            failed = report.failed,
            total = report.total,
            "Starting with partial database availability"
        );
    } else {
        info!(connected = report.connected, "All app databases connected");
    }

    let app = build_router(state.clone());

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down; closing app database connections");
    state.databases.close_all().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
