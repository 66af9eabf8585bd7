pub mod aggregate;
pub mod metrics;
pub mod templates;
pub mod users;

pub use aggregate::AggregateService;
pub use metrics::MetricsService;
pub use templates::TemplatesService;
pub use users::UsersService;

use sqlx::{Postgres, QueryBuilder};

use crate::database::{is_connection_error, ConnectionManager, DatabaseError};

/// Translate a query result, evicting the tenant's cached handles when the
/// failure is connection-level. This is the disconnect-observation point: the
/// next `get_connection` for the tenant re-establishes from scratch.
pub(crate) async fn check<T>(
    db: &ConnectionManager,
    tenant_id: &str,
    result: Result<T, sqlx::Error>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            if is_connection_error(&err) {
                db.mark_disconnected(tenant_id).await;
            }
            Err(DatabaseError::Sqlx(err))
        }
    }
}

/// Tracks whether a WHERE clause has been opened while conditions are
/// appended one by one.
pub(crate) struct SqlWhere {
    started: bool,
}

impl SqlWhere {
    pub fn new() -> Self {
        Self { started: false }
    }

    pub fn push(&mut self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}

/// Escape LIKE metacharacters so user search terms match literally.
pub(crate) fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Append a case-insensitive substring match over the given columns:
/// `(col1 ILIKE $n OR col2 ILIKE $n ...)`.
pub(crate) fn push_search(
    qb: &mut QueryBuilder<'_, Postgres>,
    clause: &mut SqlWhere,
    columns: &[&str],
    term: &str,
) {
    if columns.is_empty() {
        return;
    }
    let pattern = format!("%{}%", escape_like(term));
    clause.push(qb);
    qb.push("(");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    qb.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("50%_off\\now"), "50\\%\\_off\\\\now");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn where_clause_joins_with_and() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t");
        let mut clause = SqlWhere::new();

        clause.push(&mut qb);
        qb.push("a = ").push_bind(1i64);
        clause.push(&mut qb);
        qb.push("b = ").push_bind(2i64);

        assert_eq!(qb.into_sql(), "SELECT 1 FROM t WHERE a = $1 AND b = $2");
    }

    #[test]
    fn search_builds_ilike_group() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM users");
        let mut clause = SqlWhere::new();

        push_search(&mut qb, &mut clause, &["email", "name"], "bob");

        assert_eq!(
            qb.into_sql(),
            "SELECT 1 FROM users WHERE (email ILIKE $1 OR name ILIKE $2)"
        );
    }

    #[test]
    fn search_with_no_columns_is_a_no_op() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM metrics");
        let mut clause = SqlWhere::new();

        push_search(&mut qb, &mut clause, &[], "bob");

        assert_eq!(qb.into_sql(), "SELECT 1 FROM metrics");
    }
}
