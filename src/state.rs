use std::sync::Arc;

use crate::auth::AdminDirectory;
use crate::config::AppConfig;
use crate::database::ConnectionManager;
use crate::tenant::TenantRegistry;

/// Everything the request pipeline needs, constructed once at the process
/// root and cloned cheaply into handlers via axum's `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<TenantRegistry>,
    pub databases: Arc<ConnectionManager>,
    pub admins: Arc<AdminDirectory>,
}

impl AppState {
    pub fn new(config: AppConfig, registry: TenantRegistry, admins: AdminDirectory) -> Self {
        let registry = Arc::new(registry);
        let databases = Arc::new(ConnectionManager::new(
            registry.clone(),
            config.database.clone(),
        ));
        Self {
            config: Arc::new(config),
            registry,
            databases,
            admins: Arc::new(admins),
        }
    }
}
