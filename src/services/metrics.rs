use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{ConnectionManager, DatabaseError, EntityKind};
use crate::services::{check, SqlWhere};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardUsers {
    pub total: i64,
    pub active: i64,
    pub new_today: i64,
    pub new_this_week: i64,
    pub new_this_month: i64,
    pub by_status: HashMap<String, i64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DashboardShops {
    pub total: i64,
    pub active: i64,
}

/// Per-app overview composed from independent concurrent counts. There is no
/// snapshot isolation across the queries; the numbers can drift slightly
/// under concurrent writes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub users: DashboardUsers,
    pub shops: DashboardShops,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShopUserCount {
    pub shop: String,
    pub user_count: i64,
    pub active_users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub activity_type: &'static str,
    pub email: String,
    pub shop: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// One stored metric event from an app's own instrumentation.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MetricEvent {
    pub id: Uuid,
    pub shop: String,
    pub metric_type: String,
    pub value: Json<Value>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub metadata: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricEventParams {
    pub metric_type: Option<String>,
    pub shop: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Read-mostly analytics over one app's database.
#[derive(Clone)]
pub struct MetricsService {
    db: Arc<ConnectionManager>,
}

impl MetricsService {
    pub fn new(db: Arc<ConnectionManager>) -> Self {
        Self { db }
    }

    /// Per-app dashboard: all counts issued concurrently against the same
    /// tenant connection.
    pub async fn dashboard(&self, tenant_id: &str) -> Result<Dashboard, DatabaseError> {
        let users = self.db.get_model(tenant_id, EntityKind::User).await?;
        let shops = self.db.get_model(tenant_id, EntityKind::ShopSettings).await?;

        let now = Utc::now();
        let day_start = start_of_day(now);
        let week_start = now - Duration::days(7);
        let month_start = start_of_month(now);

        let result = tokio::try_join!(
            scalar(users.pool(), format!("SELECT COUNT(*) FROM {}", users.table())),
            scalar(
                users.pool(),
                format!("SELECT COUNT(*) FROM {} WHERE status = 'active'", users.table()),
            ),
            scalar_since(
                users.pool(),
                format!("SELECT COUNT(*) FROM {} WHERE created_at >= $1", users.table()),
                day_start,
            ),
            scalar_since(
                users.pool(),
                format!("SELECT COUNT(*) FROM {} WHERE created_at >= $1", users.table()),
                week_start,
            ),
            scalar_since(
                users.pool(),
                format!("SELECT COUNT(*) FROM {} WHERE created_at >= $1", users.table()),
                month_start,
            ),
            scalar(shops.pool(), format!("SELECT COUNT(*) FROM {}", shops.table())),
            scalar_since(
                shops.pool(),
                format!("SELECT COUNT(*) FROM {} WHERE last_active_at >= $1", shops.table()),
                week_start,
            ),
            status_breakdown(users.pool(), users.table()),
        );

        let (total, active, new_today, new_this_week, new_this_month, shop_total, shop_active, by_status) =
            check(&self.db, tenant_id, result).await?;

        Ok(Dashboard {
            users: DashboardUsers {
                total,
                active,
                new_today,
                new_this_week,
                new_this_month,
                by_status,
            },
            shops: DashboardShops {
                total: shop_total,
                active: shop_active,
            },
        })
    }

    /// New users per day over the last `days` days (clamped to 1..=365).
    pub async fn users_over_time(&self, tenant_id: &str, days: i64) -> Result<Vec<DailyCount>, DatabaseError> {
        let users = self.db.get_model(tenant_id, EntityKind::User).await?;
        let since = Utc::now() - Duration::days(days.clamp(1, 365));

        let sql = format!(
            "SELECT to_char(created_at, 'YYYY-MM-DD') AS date, COUNT(*) AS count \
             FROM {} WHERE created_at >= $1 GROUP BY 1 ORDER BY 1",
            users.table()
        );
        let series = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql).bind(since).fetch_all(users.pool()).await,
        )
        .await?;
        Ok(series)
    }

    /// Shops ranked by user count (clamped to 1..=50).
    pub async fn top_shops(&self, tenant_id: &str, limit: i64) -> Result<Vec<ShopUserCount>, DatabaseError> {
        let users = self.db.get_model(tenant_id, EntityKind::User).await?;

        let sql = format!(
            "SELECT shop, COUNT(*) AS user_count, \
             COUNT(*) FILTER (WHERE status = 'active') AS active_users \
             FROM {} GROUP BY shop ORDER BY user_count DESC LIMIT $1",
            users.table()
        );
        let shops = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql)
                .bind(limit.clamp(1, 50))
                .fetch_all(users.pool())
                .await,
        )
        .await?;
        Ok(shops)
    }

    /// Most recently touched users, classified as created vs updated.
    pub async fn recent_activity(&self, tenant_id: &str, limit: i64) -> Result<Vec<ActivityEntry>, DatabaseError> {
        let users = self.db.get_model(tenant_id, EntityKind::User).await?;

        let sql = format!(
            "SELECT email, shop, status, created_at, updated_at \
             FROM {} ORDER BY updated_at DESC LIMIT $1",
            users.table()
        );
        let rows: Vec<(String, String, String, DateTime<Utc>, DateTime<Utc>)> = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql)
                .bind(limit.clamp(1, 100))
                .fetch_all(users.pool())
                .await,
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|(email, shop, status, created_at, updated_at)| ActivityEntry {
                activity_type: activity_type(created_at, updated_at),
                email,
                shop,
                status,
                timestamp: updated_at,
            })
            .collect())
    }

    /// Stored metric events, newest first.
    pub async fn events(
        &self,
        tenant_id: &str,
        params: &MetricEventParams,
    ) -> Result<Vec<MetricEvent>, DatabaseError> {
        let model = self.db.get_model(tenant_id, EntityKind::MetricEvent).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, shop, metric_type, value, period_start, period_end, metadata, created_at \
             FROM {}",
            model.table()
        ));
        let mut clause = SqlWhere::new();
        if let Some(metric_type) = &params.metric_type {
            clause.push(&mut qb);
            qb.push("metric_type = ").push_bind(metric_type.clone());
        }
        if let Some(shop) = &params.shop {
            clause.push(&mut qb);
            qb.push("shop = ").push_bind(shop.clone());
        }
        if let Some(start) = params.start_date {
            clause.push(&mut qb);
            qb.push("created_at >= ").push_bind(start);
        }
        if let Some(end) = params.end_date {
            clause.push(&mut qb);
            qb.push("created_at <= ").push_bind(end);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(params.limit.unwrap_or(100).clamp(1, 500));

        let events = check(
            &self.db,
            tenant_id,
            qb.build_query_as().fetch_all(model.pool()).await,
        )
        .await?;
        Ok(events)
    }
}

async fn scalar(pool: &PgPool, sql: String) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&sql).fetch_one(pool).await
}

async fn scalar_since(pool: &PgPool, sql: String, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&sql).bind(since).fetch_one(pool).await
}

async fn status_breakdown(pool: &PgPool, table: &str) -> Result<HashMap<String, i64>, sqlx::Error> {
    let sql = format!("SELECT status, COUNT(*) FROM {} GROUP BY status", table);
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

fn activity_type(created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> &'static str {
    if created_at == updated_at {
        "new_user"
    } else {
        "user_updated"
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 10).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(start_of_month(now), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn activity_classification() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::seconds(30);
        assert_eq!(activity_type(t0, t0), "new_user");
        assert_eq!(activity_type(t0, t1), "user_updated");
    }

    #[test]
    fn event_filters_compose() {
        let params = MetricEventParams {
            metric_type: Some("impressions".to_string()),
            shop: Some("acme.myshopify.com".to_string()),
            start_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM metrics");
        let mut clause = SqlWhere::new();
        if let Some(metric_type) = &params.metric_type {
            clause.push(&mut qb);
            qb.push("metric_type = ").push_bind(metric_type.clone());
        }
        if let Some(shop) = &params.shop {
            clause.push(&mut qb);
            qb.push("shop = ").push_bind(shop.clone());
        }
        if let Some(start) = params.start_date {
            clause.push(&mut qb);
            qb.push("created_at >= ").push_bind(start);
        }
        assert_eq!(
            qb.into_sql(),
            "SELECT 1 FROM metrics WHERE metric_type = $1 AND shop = $2 AND created_at >= $3"
        );
    }
}
