use serde::Serialize;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Full configuration for one managed app, including its connection URL.
/// Never serialized to clients; use [`TenantSummary`] for that.
#[derive(Debug, Clone)]
pub struct TenantDescriptor {
    pub id: String,
    pub display_name: String,
    pub database_url: String,
    /// Collections this app exposes to the back office.
    pub collections: HashSet<String>,
    /// Per-app feature toggles, e.g. "can_edit_templates".
    pub features: HashMap<String, bool>,
}

impl TenantDescriptor {
    /// A descriptor is connectable when its URL is present and parses.
    /// Connect errors for well-formed URLs are still discovered lazily.
    pub fn has_valid_url(&self) -> bool {
        !self.database_url.is_empty() && Url::parse(&self.database_url).is_ok()
    }
}

/// Public-safe projection of a tenant (no connection URL).
#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub id: String,
    pub name: String,
    pub features: HashMap<String, bool>,
}

impl From<&TenantDescriptor> for TenantSummary {
    fn from(t: &TenantDescriptor) -> Self {
        Self {
            id: t.id.clone(),
            name: t.display_name.clone(),
            features: t.features.clone(),
        }
    }
}

/// Immutable mapping from app id to its configuration.
///
/// Built once at startup; adding or changing apps requires a restart.
#[derive(Debug, Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, TenantDescriptor>,
}

impl TenantRegistry {
    pub fn new(tenants: Vec<TenantDescriptor>) -> Self {
        Self {
            tenants: tenants.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Load tenants from APP_{n}_* environment variables, starting at n = 1
    /// and stopping at the first index with no APP_{n}_ID set.
    ///
    /// Recognized per app: APP_{n}_ID, APP_{n}_NAME, APP_{n}_DATABASE_URL,
    /// APP_{n}_COLLECTIONS (comma-separated), APP_{n}_FEATURES
    /// (comma-separated flag names, each enabled).
    pub fn from_env() -> Self {
        let mut tenants = Vec::new();
        for n in 1.. {
            let id = match std::env::var(format!("APP_{}_ID", n)) {
                Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
                _ => break,
            };

            let display_name = std::env::var(format!("APP_{}_NAME", n))
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| id.clone());

            let database_url = std::env::var(format!("APP_{}_DATABASE_URL", n)).unwrap_or_default();

            let collections = std::env::var(format!("APP_{}_COLLECTIONS", n))
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let features = std::env::var(format!("APP_{}_FEATURES", n))
                .map(|v| {
                    v.split(',')
                        .map(|s| (s.trim().to_string(), true))
                        .filter(|(s, _)| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            tenants.push(TenantDescriptor {
                id,
                display_name,
                database_url,
                collections,
                features,
            });
        }

        tracing::info!(apps = tenants.len(), "Loaded tenant registry from environment");
        Self::new(tenants)
    }

    /// All configured apps as their public projection.
    pub fn list_all(&self) -> Vec<TenantSummary> {
        let mut all: Vec<TenantSummary> = self.tenants.values().map(TenantSummary::from).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn resolve(&self, tenant_id: &str) -> Option<&TenantDescriptor> {
        self.tenants.get(tenant_id)
    }

    pub fn exists(&self, tenant_id: &str) -> bool {
        self.tenants.contains_key(tenant_id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, url: &str) -> TenantDescriptor {
        TenantDescriptor {
            id: id.to_string(),
            display_name: format!("App {}", id),
            database_url: url.to_string(),
            collections: HashSet::new(),
            features: HashMap::new(),
        }
    }

    #[test]
    fn resolves_configured_tenants() {
        let registry = TenantRegistry::new(vec![descriptor("shop-a", "postgres://x/a")]);

        assert!(registry.exists("shop-a"));
        assert!(!registry.exists("shop-b"));
        assert_eq!(registry.resolve("shop-a").unwrap().display_name, "App shop-a");
        assert!(registry.resolve("shop-b").is_none());
    }

    #[test]
    fn list_all_excludes_database_url() {
        let registry = TenantRegistry::new(vec![descriptor("shop-a", "postgres://secret/a")]);

        let listed = registry.list_all();
        assert_eq!(listed.len(), 1);
        let json = serde_json::to_value(&listed[0]).unwrap();
        assert_eq!(json["id"], "shop-a");
        assert!(json.get("database_url").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn url_validity() {
        assert!(descriptor("a", "postgres://host:5432/app").has_valid_url());
        assert!(!descriptor("a", "").has_valid_url());
        assert!(!descriptor("a", "not a url").has_valid_url());
    }

    #[test]
    fn ids_are_sorted() {
        let registry = TenantRegistry::new(vec![
            descriptor("beta", "postgres://x/b"),
            descriptor("alpha", "postgres://x/a"),
        ]);
        assert_eq!(registry.ids(), vec!["alpha", "beta"]);
    }
}
