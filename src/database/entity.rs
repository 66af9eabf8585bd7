use serde::{Deserialize, Serialize};

/// The record categories this back office manages inside each app database.
///
/// Each kind maps to one table and a fixed set of queryable columns, declared
/// once here instead of being passed around as runtime schema values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    EmailTemplate,
    MetricEvent,
    ShopSettings,
}

/// Static description of one entity kind: where it lives and which columns
/// the list endpoints may search and sort on.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub table: &'static str,
    /// Columns covered by free-text search (case-insensitive substring).
    pub searchable: &'static [&'static str],
    /// Whitelist for caller-supplied sort fields.
    pub sortable: &'static [&'static str],
    pub default_sort: &'static str,
}

const USER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::User,
    table: "users",
    searchable: &["email", "name"],
    sortable: &["email", "name", "status", "shop", "created_at", "updated_at"],
    default_sort: "created_at",
};

const EMAIL_TEMPLATE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::EmailTemplate,
    table: "email_templates",
    searchable: &["name", "slug", "subject"],
    sortable: &["name", "slug", "category", "shop", "created_at", "updated_at"],
    default_sort: "updated_at",
};

const METRIC_EVENT: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::MetricEvent,
    table: "metrics",
    searchable: &[],
    sortable: &["created_at", "metric_type", "shop"],
    default_sort: "created_at",
};

const SHOP_SETTINGS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::ShopSettings,
    table: "shop_settings",
    searchable: &["shop"],
    sortable: &["shop", "installed_at", "last_active_at"],
    default_sort: "shop",
};

impl EntityKind {
    pub const ALL: &'static [EntityKind] = &[
        EntityKind::User,
        EntityKind::EmailTemplate,
        EntityKind::MetricEvent,
        EntityKind::ShopSettings,
    ];

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        match self {
            EntityKind::User => &USER,
            EntityKind::EmailTemplate => &EMAIL_TEMPLATE,
            EntityKind::MetricEvent => &METRIC_EVENT,
            EntityKind::ShopSettings => &SHOP_SETTINGS,
        }
    }

    pub fn table(&self) -> &'static str {
        self.descriptor().table
    }

    /// Resolve a caller-supplied sort field against the whitelist, falling
    /// back to the kind's default.
    pub fn sort_column(&self, requested: Option<&str>) -> &'static str {
        let desc = self.descriptor();
        match requested {
            Some(field) => desc
                .sortable
                .iter()
                .find(|c| **c == field)
                .copied()
                .unwrap_or(desc.default_sort),
            None => desc.default_sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_are_consistent() {
        for kind in EntityKind::ALL {
            let desc = kind.descriptor();
            assert_eq!(desc.kind, *kind);
            assert!(!desc.table.is_empty());
            assert!(desc.sortable.contains(&desc.default_sort));
        }
    }

    #[test]
    fn sort_column_rejects_unknown_fields() {
        assert_eq!(EntityKind::User.sort_column(Some("email")), "email");
        assert_eq!(EntityKind::User.sort_column(Some("password")), "created_at");
        assert_eq!(EntityKind::User.sort_column(None), "created_at");
        // Would-be injection strings fall back to the default
        assert_eq!(EntityKind::User.sort_column(Some("1; DROP TABLE users")), "created_at");
    }
}
