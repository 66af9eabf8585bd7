use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{Page, PageInfo, PageQuery, SortDirection};
use crate::database::{ConnectionManager, DatabaseError, EntityKind};
use crate::services::{check, push_search, SqlWhere};

/// A user of one of the managed apps (not a back-office admin).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AppUser {
    pub id: Uuid,
    pub shop: String,
    pub email: String,
    pub name: Option<String>,
    pub status: String,
    pub settings: Json<Value>,
    pub metadata: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, shop, email, name, status, settings, metadata, created_at, updated_at";

/// The fixed set of states an app user can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
    Blocked,
}

impl UserStatus {
    pub const ALL: &'static [UserStatus] = &[
        UserStatus::Active,
        UserStatus::Inactive,
        UserStatus::Pending,
        UserStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Pending => "pending",
            UserStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().find(|v| v.as_str() == s).copied()
    }
}

#[derive(Debug, Error)]
pub enum UsersError {
    #[error("Invalid status \"{0}\"; expected one of: active, inactive, pending, blocked")]
    InvalidStatus(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// List filters for app users. Everything optional; unknown sort fields fall
/// back to the default. Page fields are inlined rather than nested so the
/// struct deserializes straight from a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub shop: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortDirection>,
}

impl UserListParams {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Partial update. Server-owned fields (id, shop, created_at) are not
/// representable here, so they cannot be overwritten from the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub settings: Option<Value>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub by_status: HashMap<String, i64>,
}

/// Stateless per-tenant user operations.
#[derive(Clone)]
pub struct UsersService {
    db: Arc<ConnectionManager>,
}

impl UsersService {
    pub fn new(db: Arc<ConnectionManager>) -> Self {
        Self { db }
    }

    fn apply_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &UserListParams) {
        let mut clause = SqlWhere::new();
        if let Some(shop) = &params.shop {
            clause.push(qb);
            qb.push("shop = ").push_bind(shop.clone());
        }
        if let Some(status) = &params.status {
            clause.push(qb);
            qb.push("status = ").push_bind(status.clone());
        }
        if let Some(search) = &params.search {
            push_search(qb, &mut clause, EntityKind::User.descriptor().searchable, search);
        }
    }

    /// Paginated listing. Total comes from a separate count query over the
    /// same predicate; under concurrent writes it may be stale relative to
    /// the returned page.
    pub async fn list(&self, tenant_id: &str, params: &UserListParams) -> Result<Page<AppUser>, UsersError> {
        let model = self.db.get_model(tenant_id, EntityKind::User).await?;
        let (page, limit) = params.page_query().normalize(20, 100);

        let mut count_qb =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", model.table()));
        Self::apply_filters(&mut count_qb, params);
        let total: i64 = check(
            &self.db,
            tenant_id,
            count_qb.build_query_scalar().fetch_one(model.pool()).await,
        )
        .await?;

        let sort_column = EntityKind::User.sort_column(params.sort_by.as_deref());
        let direction = params.sort_order.unwrap_or_default().to_sql();

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {}",
            USER_COLUMNS,
            model.table()
        ));
        Self::apply_filters(&mut qb, params);
        qb.push(format!(" ORDER BY {} {}", sort_column, direction));
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind((page - 1) * limit);

        let data: Vec<AppUser> = check(
            &self.db,
            tenant_id,
            qb.build_query_as().fetch_all(model.pool()).await,
        )
        .await?;

        Ok(Page {
            data,
            pagination: PageInfo::new(page, limit, total),
        })
    }

    pub async fn get_by_id(&self, tenant_id: &str, user_id: Uuid) -> Result<Option<AppUser>, UsersError> {
        let model = self.db.get_model(tenant_id, EntityKind::User).await?;
        let sql = format!("SELECT {} FROM {} WHERE id = $1", USER_COLUMNS, model.table());
        let user = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql).bind(user_id).fetch_optional(model.pool()).await,
        )
        .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, tenant_id: &str, email: &str) -> Result<Option<AppUser>, UsersError> {
        let model = self.db.get_model(tenant_id, EntityKind::User).await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE lower(email) = lower($1)",
            USER_COLUMNS,
            model.table()
        );
        let user = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql).bind(email).fetch_optional(model.pool()).await,
        )
        .await?;
        Ok(user)
    }

    /// Apply a partial update; `None` means the record did not exist.
    pub async fn update(
        &self,
        tenant_id: &str,
        user_id: Uuid,
        update: &UpdateUser,
    ) -> Result<Option<AppUser>, UsersError> {
        if let Some(status) = &update.status {
            if UserStatus::parse(status).is_none() {
                return Err(UsersError::InvalidStatus(status.clone()));
            }
        }

        let model = self.db.get_model(tenant_id, EntityKind::User).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} SET updated_at = NOW()",
            model.table()
        ));
        if let Some(email) = &update.email {
            qb.push(", email = ").push_bind(email.trim().to_lowercase());
        }
        if let Some(name) = &update.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(status) = &update.status {
            qb.push(", status = ").push_bind(status.clone());
        }
        if let Some(settings) = &update.settings {
            qb.push(", settings = ").push_bind(Json(settings.clone()));
        }
        if let Some(metadata) = &update.metadata {
            qb.push(", metadata = ").push_bind(Json(metadata.clone()));
        }
        qb.push(" WHERE id = ").push_bind(user_id);
        qb.push(format!(" RETURNING {}", USER_COLUMNS));

        let user = check(
            &self.db,
            tenant_id,
            qb.build_query_as().fetch_optional(model.pool()).await,
        )
        .await?;
        Ok(user)
    }

    /// Transition a user to one of the fixed statuses.
    pub async fn update_status(
        &self,
        tenant_id: &str,
        user_id: Uuid,
        status: &str,
    ) -> Result<Option<AppUser>, UsersError> {
        let status =
            UserStatus::parse(status).ok_or_else(|| UsersError::InvalidStatus(status.to_string()))?;

        let model = self.db.get_model(tenant_id, EntityKind::User).await?;
        let sql = format!(
            "UPDATE {} SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            model.table(),
            USER_COLUMNS
        );
        let user = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql)
                .bind(status.as_str())
                .bind(user_id)
                .fetch_optional(model.pool())
                .await,
        )
        .await?;
        Ok(user)
    }

    /// Total plus per-status breakdown, optionally scoped to one shop.
    pub async fn stats(&self, tenant_id: &str, shop: Option<&str>) -> Result<UserStats, UsersError> {
        let model = self.db.get_model(tenant_id, EntityKind::User).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT status, COUNT(*) FROM {}",
            model.table()
        ));
        if let Some(shop) = shop {
            qb.push(" WHERE shop = ").push_bind(shop.to_string());
        }
        qb.push(" GROUP BY status");

        let rows: Vec<(String, i64)> = check(
            &self.db,
            tenant_id,
            qb.build_query_as().fetch_all(model.pool()).await,
        )
        .await?;

        let total = rows.iter().map(|(_, count)| count).sum();
        let by_status = rows.into_iter().collect();
        Ok(UserStats { total, by_status })
    }

    /// Distinct shops seen across this app's users.
    pub async fn shops(&self, tenant_id: &str) -> Result<Vec<String>, UsersError> {
        let model = self.db.get_model(tenant_id, EntityKind::User).await?;
        let sql = format!("SELECT DISTINCT shop FROM {} ORDER BY shop", model.table());
        let shops = check(
            &self.db,
            tenant_id,
            sqlx::query_scalar(&sql).fetch_all(model.pool()).await,
        )
        .await?;
        Ok(shops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing() {
        assert_eq!(UserStatus::parse("active"), Some(UserStatus::Active));
        assert_eq!(UserStatus::parse("blocked"), Some(UserStatus::Blocked));
        assert_eq!(UserStatus::parse("ACTIVE"), None);
        assert_eq!(UserStatus::parse("deleted"), None);
    }

    #[test]
    fn list_filters_compose() {
        let params = UserListParams {
            shop: Some("acme.myshopify.com".to_string()),
            status: Some("active".to_string()),
            search: Some("bob".to_string()),
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        UsersService::apply_filters(&mut qb, &params);
        assert_eq!(
            qb.into_sql(),
            "SELECT COUNT(*) FROM users WHERE shop = $1 AND status = $2 \
             AND (email ILIKE $3 OR name ILIKE $4)"
        );
    }

    #[test]
    fn empty_filters_add_no_where() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        UsersService::apply_filters(&mut qb, &UserListParams::default());
        assert_eq!(qb.into_sql(), "SELECT COUNT(*) FROM users");
    }
}
