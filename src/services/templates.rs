use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{Page, PageInfo, PageQuery};
use crate::database::{ConnectionManager, DatabaseError, EntityKind};
use crate::services::{check, push_search, SqlWhere};

/// One email template, body included.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub shop: String,
    pub name: String,
    pub slug: String,
    pub subject: String,
    pub html_content: String,
    pub text_content: Option<String>,
    pub variables: Json<Vec<TemplateVariable>>,
    pub is_active: bool,
    pub category: String,
    pub last_modified_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing projection: body columns are excluded to keep list payloads small.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailTemplateSummary {
    pub id: Uuid,
    pub shop: String,
    pub name: String,
    pub slug: String,
    pub subject: String,
    pub is_active: bool,
    pub category: String,
    pub last_modified_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

const TEMPLATE_COLUMNS: &str = "id, shop, name, slug, subject, html_content, text_content, \
                                variables, is_active, category, last_modified_by, created_at, updated_at";
const SUMMARY_COLUMNS: &str =
    "id, shop, name, slug, subject, is_active, category, last_modified_by, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateCategory {
    Transactional,
    Marketing,
    Notification,
    System,
}

impl TemplateCategory {
    pub const ALL: &'static [TemplateCategory] = &[
        TemplateCategory::Transactional,
        TemplateCategory::Marketing,
        TemplateCategory::Notification,
        TemplateCategory::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::Transactional => "transactional",
            TemplateCategory::Marketing => "marketing",
            TemplateCategory::Notification => "notification",
            TemplateCategory::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().find(|v| v.as_str() == s).copied()
    }
}

#[derive(Debug, Error)]
pub enum TemplatesError {
    #[error("Invalid category \"{0}\"; expected one of: transactional, marketing, notification, system")]
    InvalidCategory(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Page fields are inlined rather than nested so the struct deserializes
/// straight from a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub shop: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl TemplateListParams {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub shop: String,
    pub name: String,
    pub slug: String,
    pub subject: String,
    pub html_content: String,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial update; id, shop and created_at are not representable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub subject: Option<String>,
    pub html_content: Option<String>,
    pub text_content: Option<String>,
    pub variables: Option<Vec<TemplateVariable>>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Stateless per-tenant email-template operations. Mutations record the
/// acting admin in `last_modified_by`.
#[derive(Clone)]
pub struct TemplatesService {
    db: Arc<ConnectionManager>,
}

impl TemplatesService {
    pub fn new(db: Arc<ConnectionManager>) -> Self {
        Self { db }
    }

    fn apply_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &TemplateListParams) {
        let mut clause = SqlWhere::new();
        if let Some(shop) = &params.shop {
            clause.push(qb);
            qb.push("shop = ").push_bind(shop.clone());
        }
        if let Some(category) = &params.category {
            clause.push(qb);
            qb.push("category = ").push_bind(category.clone());
        }
        if let Some(is_active) = params.is_active {
            clause.push(qb);
            qb.push("is_active = ").push_bind(is_active);
        }
        if let Some(search) = &params.search {
            push_search(
                qb,
                &mut clause,
                EntityKind::EmailTemplate.descriptor().searchable,
                search,
            );
        }
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        params: &TemplateListParams,
    ) -> Result<Page<EmailTemplateSummary>, TemplatesError> {
        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;
        let (page, limit) = params.page_query().normalize(50, 100);

        let mut count_qb =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", model.table()));
        Self::apply_filters(&mut count_qb, params);
        let total: i64 = check(
            &self.db,
            tenant_id,
            count_qb.build_query_scalar().fetch_one(model.pool()).await,
        )
        .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {}",
            SUMMARY_COLUMNS,
            model.table()
        ));
        Self::apply_filters(&mut qb, params);
        qb.push(" ORDER BY updated_at DESC");
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind((page - 1) * limit);

        let data: Vec<EmailTemplateSummary> = check(
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

    pub async fn get_by_id(
        &self,
        tenant_id: &str,
        template_id: Uuid,
    ) -> Result<Option<EmailTemplate>, TemplatesError> {
        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;
        let sql = format!("SELECT {} FROM {} WHERE id = $1", TEMPLATE_COLUMNS, model.table());
        let template = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql).bind(template_id).fetch_optional(model.pool()).await,
        )
        .await?;
        Ok(template)
    }

    pub async fn get_by_slug(
        &self,
        tenant_id: &str,
        shop: &str,
        slug: &str,
    ) -> Result<Option<EmailTemplate>, TemplatesError> {
        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE shop = $1 AND slug = $2",
            TEMPLATE_COLUMNS,
            model.table()
        );
        let template = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql)
                .bind(shop)
                .bind(slug)
                .fetch_optional(model.pool())
                .await,
        )
        .await?;
        Ok(template)
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        input: &CreateTemplate,
        admin_id: &str,
    ) -> Result<EmailTemplate, TemplatesError> {
        let category = match input.category.as_deref() {
            Some(c) => TemplateCategory::parse(c)
                .ok_or_else(|| TemplatesError::InvalidCategory(c.to_string()))?,
            None => TemplateCategory::Transactional,
        };

        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;
        let sql = format!(
            "INSERT INTO {} (id, shop, name, slug, subject, html_content, text_content, \
             variables, is_active, category, last_modified_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, $9, $10, NOW(), NOW()) \
             RETURNING {}",
            model.table(),
            TEMPLATE_COLUMNS
        );

        let template = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql)
                .bind(Uuid::new_v4())
                .bind(&input.shop)
                .bind(input.name.trim())
                .bind(input.slug.trim().to_lowercase())
                .bind(&input.subject)
                .bind(&input.html_content)
                .bind(&input.text_content)
                .bind(Json(input.variables.clone()))
                .bind(category.as_str())
                .bind(admin_id)
                .fetch_one(model.pool())
                .await,
        )
        .await?;
        Ok(template)
    }

    pub async fn update(
        &self,
        tenant_id: &str,
        template_id: Uuid,
        update: &UpdateTemplate,
        admin_id: &str,
    ) -> Result<Option<EmailTemplate>, TemplatesError> {
        if let Some(category) = &update.category {
            if TemplateCategory::parse(category).is_none() {
                return Err(TemplatesError::InvalidCategory(category.clone()));
            }
        }

        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} SET updated_at = NOW(), last_modified_by = ",
            model.table()
        ));
        qb.push_bind(admin_id.to_string());
        if let Some(name) = &update.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(slug) = &update.slug {
            qb.push(", slug = ").push_bind(slug.trim().to_lowercase());
        }
        if let Some(subject) = &update.subject {
            qb.push(", subject = ").push_bind(subject.clone());
        }
        if let Some(html) = &update.html_content {
            qb.push(", html_content = ").push_bind(html.clone());
        }
        if let Some(text) = &update.text_content {
            qb.push(", text_content = ").push_bind(text.clone());
        }
        if let Some(variables) = &update.variables {
            qb.push(", variables = ").push_bind(Json(variables.clone()));
        }
        if let Some(category) = &update.category {
            qb.push(", category = ").push_bind(category.clone());
        }
        if let Some(is_active) = update.is_active {
            qb.push(", is_active = ").push_bind(is_active);
        }
        qb.push(" WHERE id = ").push_bind(template_id);
        qb.push(format!(" RETURNING {}", TEMPLATE_COLUMNS));

        let template = check(
            &self.db,
            tenant_id,
            qb.build_query_as().fetch_optional(model.pool()).await,
        )
        .await?;
        Ok(template)
    }

    pub async fn toggle_active(
        &self,
        tenant_id: &str,
        template_id: Uuid,
        is_active: bool,
        admin_id: &str,
    ) -> Result<Option<EmailTemplate>, TemplatesError> {
        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;
        let sql = format!(
            "UPDATE {} SET is_active = $1, last_modified_by = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING {}",
            model.table(),
            TEMPLATE_COLUMNS
        );
        let template = check(
            &self.db,
            tenant_id,
            sqlx::query_as(&sql)
                .bind(is_active)
                .bind(admin_id)
                .bind(template_id)
                .fetch_optional(model.pool())
                .await,
        )
        .await?;
        Ok(template)
    }

    /// Returns whether a row was actually deleted.
    pub async fn delete(&self, tenant_id: &str, template_id: Uuid) -> Result<bool, TemplatesError> {
        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;
        let sql = format!("DELETE FROM {} WHERE id = $1", model.table());
        let result = check(
            &self.db,
            tenant_id,
            sqlx::query(&sql).bind(template_id).execute(model.pool()).await,
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Copy an existing template under a new slug (defaults to `<slug>-copy`).
    pub async fn duplicate(
        &self,
        tenant_id: &str,
        template_id: Uuid,
        new_slug: Option<&str>,
        admin_id: &str,
    ) -> Result<Option<EmailTemplate>, TemplatesError> {
        let Some(original) = self.get_by_id(tenant_id, template_id).await? else {
            return Ok(None);
        };

        let slug = new_slug
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}-copy", original.slug));

        let input = CreateTemplate {
            shop: original.shop.clone(),
            name: format!("{} (Copy)", original.name),
            slug,
            subject: original.subject.clone(),
            html_content: original.html_content.clone(),
            text_content: original.text_content.clone(),
            variables: original.variables.0.clone(),
            category: Some(original.category.clone()),
        };

        let copy = self.create(tenant_id, &input, admin_id).await?;
        Ok(Some(copy))
    }

    /// Category breakdown, optionally scoped to one shop.
    pub async fn categories(
        &self,
        tenant_id: &str,
        shop: Option<&str>,
    ) -> Result<Vec<CategoryCount>, TemplatesError> {
        let model = self.db.get_model(tenant_id, EntityKind::EmailTemplate).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT category, COUNT(*) AS count FROM {}",
            model.table()
        ));
        if let Some(shop) = shop {
            qb.push(" WHERE shop = ").push_bind(shop.to_string());
        }
        qb.push(" GROUP BY category ORDER BY count DESC");

        let counts = check(
            &self.db,
            tenant_id,
            qb.build_query_as().fetch_all(model.pool()).await,
        )
        .await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing() {
        assert_eq!(TemplateCategory::parse("marketing"), Some(TemplateCategory::Marketing));
        assert_eq!(TemplateCategory::parse("system"), Some(TemplateCategory::System));
        assert_eq!(TemplateCategory::parse("spam"), None);
    }

    #[test]
    fn list_filters_compose() {
        let params = TemplateListParams {
            shop: Some("acme.myshopify.com".to_string()),
            is_active: Some(true),
            search: Some("welcome".to_string()),
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM email_templates");
        TemplatesService::apply_filters(&mut qb, &params);
        assert_eq!(
            qb.into_sql(),
            "SELECT COUNT(*) FROM email_templates WHERE shop = $1 AND is_active = $2 \
             AND (name ILIKE $3 OR slug ILIKE $4 OR subject ILIKE $5)"
        );
    }

    #[test]
    fn summary_excludes_body_columns() {
        assert!(!SUMMARY_COLUMNS.contains("html_content"));
        assert!(!SUMMARY_COLUMNS.contains("text_content"));
        assert!(TEMPLATE_COLUMNS.contains("html_content"));
    }
}
