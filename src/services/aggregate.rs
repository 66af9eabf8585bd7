use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::database::{ConnectionManager, DatabaseError};
use crate::services::metrics::{DailyCount, Dashboard, MetricsService, ShopUserCount};

/// One app's contribution to a cross-app aggregate. A failing app carries an
/// error marker instead of data; it never aborts the whole aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct AppSlice<T> {
    pub app_id: String,
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AggregateDashboard {
    pub aggregate: Dashboard,
    pub by_app: Vec<AppSlice<Dashboard>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppCount {
    pub name: String,
    pub count: i64,
}

/// Totals for one calendar date across every app.
#[derive(Debug, Clone, Serialize)]
pub struct DatePoint {
    pub date: String,
    pub total: i64,
    pub by_app: HashMap<String, AppCount>,
}

#[derive(Debug, Serialize)]
pub struct AggregateUsersOverTime {
    pub aggregate: Vec<DatePoint>,
    pub by_app: Vec<AppSlice<Vec<DailyCount>>>,
}

/// Totals for one shop across every app it appears in.
#[derive(Debug, Clone, Serialize)]
pub struct ShopTotal {
    pub shop: String,
    pub total_users: i64,
    pub active_users: i64,
    pub by_app: HashMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct AggregateTopShops {
    pub aggregate: Vec<ShopTotal>,
    pub by_app: Vec<AppSlice<Vec<ShopUserCount>>>,
}

/// Fan-out queries across every configured app, with per-app failure
/// isolation and merged totals.
#[derive(Clone)]
pub struct AggregateService {
    db: Arc<ConnectionManager>,
    metrics: MetricsService,
}

impl AggregateService {
    pub fn new(db: Arc<ConnectionManager>) -> Self {
        let metrics = MetricsService::new(db.clone());
        Self { db, metrics }
    }

    pub async fn dashboard(&self) -> AggregateDashboard {
        let by_app = self
            .fan_out(|metrics, app_id| async move { metrics.dashboard(&app_id).await })
            .await;
        let aggregate = merge_dashboards(by_app.iter().filter_map(|s| s.data.as_ref()));
        AggregateDashboard { aggregate, by_app }
    }

    pub async fn users_over_time(&self, days: i64) -> AggregateUsersOverTime {
        let by_app = self
            .fan_out(move |metrics, app_id| async move { metrics.users_over_time(&app_id, days).await })
            .await;
        let aggregate = merge_daily_counts(&by_app);
        AggregateUsersOverTime { aggregate, by_app }
    }

    pub async fn top_shops(&self, limit: i64) -> AggregateTopShops {
        let by_app = self
            .fan_out(move |metrics, app_id| async move { metrics.top_shops(&app_id, limit).await })
            .await;
        let aggregate = merge_top_shops(&by_app, limit as usize);
        AggregateTopShops { aggregate, by_app }
    }

    /// Run one operation against every registered app concurrently. Unlike
    /// app-scoped requests there is no tenant-resolution hook here, so each
    /// slot establishes its own connection before querying.
    async fn fan_out<T, F, Fut>(&self, op: F) -> Vec<AppSlice<T>>
    where
        F: Fn(MetricsService, String) -> Fut,
        Fut: std::future::Future<Output = Result<T, DatabaseError>>,
    {
        let apps = self.db.registry().list_all();
        let tasks = apps.into_iter().map(|app| {
            let db = self.db.clone();
            let task = op(self.metrics.clone(), app.id.clone());
            async move {
                let result: Result<T, DatabaseError> = async {
                    db.get_connection(&app.id).await?;
                    task.await
                }
                .await;

                match result {
                    Ok(data) => AppSlice {
                        app_id: app.id,
                        app_name: app.name,
                        data: Some(data),
                        error: None,
                    },
                    Err(err) => {
                        warn!(app = %app.id, error = %err, "App excluded from aggregate");
                        AppSlice {
                            app_id: app.id,
                            app_name: app.name,
                            data: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            }
        });
        join_all(tasks).await
    }
}

fn merge_dashboards<'a>(dashboards: impl Iterator<Item = &'a Dashboard>) -> Dashboard {
    let mut merged = Dashboard::default();
    for d in dashboards {
        merged.users.total += d.users.total;
        merged.users.active += d.users.active;
        merged.users.new_today += d.users.new_today;
        merged.users.new_this_week += d.users.new_this_week;
        merged.users.new_this_month += d.users.new_this_month;
        for (status, count) in &d.users.by_status {
            *merged.users.by_status.entry(status.clone()).or_insert(0) += count;
        }
        merged.shops.total += d.shops.total;
        merged.shops.active += d.shops.active;
    }
    merged
}

fn merge_daily_counts(slices: &[AppSlice<Vec<DailyCount>>]) -> Vec<DatePoint> {
    // BTreeMap keeps the merged series date-ordered
    let mut by_date: BTreeMap<String, DatePoint> = BTreeMap::new();
    for slice in slices {
        let Some(series) = &slice.data else { continue };
        for point in series {
            let entry = by_date.entry(point.date.clone()).or_insert_with(|| DatePoint {
                date: point.date.clone(),
                total: 0,
                by_app: HashMap::new(),
            });
            entry.total += point.count;
            entry.by_app.insert(
                slice.app_id.clone(),
                AppCount {
                    name: slice.app_name.clone(),
                    count: point.count,
                },
            );
        }
    }
    by_date.into_values().collect()
}

fn merge_top_shops(slices: &[AppSlice<Vec<ShopUserCount>>], limit: usize) -> Vec<ShopTotal> {
    let mut by_shop: HashMap<String, ShopTotal> = HashMap::new();
    for slice in slices {
        let Some(shops) = &slice.data else { continue };
        for shop in shops {
            let entry = by_shop.entry(shop.shop.clone()).or_insert_with(|| ShopTotal {
                shop: shop.shop.clone(),
                total_users: 0,
                active_users: 0,
                by_app: HashMap::new(),
            });
            entry.total_users += shop.user_count;
            entry.active_users += shop.active_users;
            entry.by_app.insert(slice.app_id.clone(), shop.user_count);
        }
    }

    let mut merged: Vec<ShopTotal> = by_shop.into_values().collect();
    merged.sort_by(|a, b| b.total_users.cmp(&a.total_users).then(a.shop.cmp(&b.shop)));
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::metrics::{DashboardShops, DashboardUsers};

    fn slice<T>(app_id: &str, data: Option<T>, error: Option<&str>) -> AppSlice<T> {
        AppSlice {
            app_id: app_id.to_string(),
            app_name: format!("App {}", app_id),
            data,
            error: error.map(String::from),
        }
    }

    fn dashboard(total: i64, active: i64) -> Dashboard {
        let mut by_status = HashMap::new();
        by_status.insert("active".to_string(), active);
        by_status.insert("inactive".to_string(), total - active);
        Dashboard {
            users: DashboardUsers {
                total,
                active,
                new_today: 1,
                new_this_week: 2,
                new_this_month: 3,
                by_status,
            },
            shops: DashboardShops { total: 5, active: 4 },
        }
    }

    #[test]
    fn failed_app_contributes_zero_to_dashboard_totals() {
        let slices = vec![
            slice("a", Some(dashboard(10, 7)), None),
            slice("b", None, Some("connect refused")),
        ];

        let merged = merge_dashboards(slices.iter().filter_map(|s| s.data.as_ref()));
        assert_eq!(merged.users.total, 10);
        assert_eq!(merged.users.active, 7);
        assert_eq!(merged.users.by_status["inactive"], 3);
        assert_eq!(merged.shops.total, 5);
    }

    #[test]
    fn dashboards_sum_across_apps() {
        let slices = vec![
            slice("a", Some(dashboard(10, 7)), None),
            slice("b", Some(dashboard(20, 5)), None),
        ];

        let merged = merge_dashboards(slices.iter().filter_map(|s| s.data.as_ref()));
        assert_eq!(merged.users.total, 30);
        assert_eq!(merged.users.active, 12);
        assert_eq!(merged.users.by_status["active"], 12);
        assert_eq!(merged.shops.active, 8);
    }

    #[test]
    fn daily_counts_merge_by_date_in_order() {
        let slices = vec![
            slice(
                "a",
                Some(vec![
                    DailyCount { date: "2024-03-02".into(), count: 3 },
                    DailyCount { date: "2024-03-01".into(), count: 1 },
                ]),
                None,
            ),
            slice(
                "b",
                Some(vec![DailyCount { date: "2024-03-02".into(), count: 4 }]),
                None,
            ),
            slice("c", None, Some("boom")),
        ];

        let merged = merge_daily_counts(&slices);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].date, "2024-03-01");
        assert_eq!(merged[0].total, 1);
        assert_eq!(merged[1].date, "2024-03-02");
        assert_eq!(merged[1].total, 7);
        assert_eq!(merged[1].by_app["b"].count, 4);
    }

    #[test]
    fn top_shops_merge_and_rank() {
        let slices = vec![
            slice(
                "a",
                Some(vec![
                    ShopUserCount { shop: "x".into(), user_count: 5, active_users: 3 },
                    ShopUserCount { shop: "y".into(), user_count: 9, active_users: 2 },
                ]),
                None,
            ),
            slice(
                "b",
                Some(vec![ShopUserCount { shop: "x".into(), user_count: 6, active_users: 1 }]),
                None,
            ),
        ];

        let merged = merge_top_shops(&slices, 10);
        assert_eq!(merged[0].shop, "x");
        assert_eq!(merged[0].total_users, 11);
        assert_eq!(merged[0].active_users, 4);
        assert_eq!(merged[0].by_app["a"], 5);
        assert_eq!(merged[1].shop, "y");

        let truncated = merge_top_shops(&slices, 1);
        assert_eq!(truncated.len(), 1);
    }
}
