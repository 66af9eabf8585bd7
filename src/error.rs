// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::DatabaseError;

/// HTTP API error with appropriate status codes and client-safe messages.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
        }
    }

    /// Stable error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "success": false,
                    "error": message,
                    "code": "VALIDATION_ERROR"
                });
                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }
                response
            }
            _ => json!({
                "success": false,
                "error": self.message(),
                "code": self.error_code()
            }),
        }
    }
}

// Static constructors
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UnknownTenant(id) => ApiError::not_found(format!("App \"{}\" not found", id)),
            DatabaseError::MisconfiguredTenant(id) => {
                tracing::error!(app = %id, "App has no database URL configured");
                ApiError::internal_server_error("App database is not configured")
            }
            DatabaseError::NotConnected(id) => {
                // Programmer-error guard: a model was requested before the
                // tenant-resolution hook established the connection.
                tracing::error!(app = %id, "Model requested before connection was established");
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::ConnectFailure { tenant, source } => {
                tracing::error!(app = %tenant, error = %source, "App database connect failed");
                ApiError::service_unavailable("App database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but never expose SQL detail to clients
                tracing::error!(error = %sqlx_err, "Database query error");
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::services::users::UsersError> for ApiError {
    fn from(err: crate::services::users::UsersError) -> Self {
        use crate::services::users::UsersError;
        match err {
            UsersError::InvalidStatus(_) => ApiError::bad_request(err.to_string()),
            UsersError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::templates::TemplatesError> for ApiError {
    fn from(err: crate::services::templates::TemplatesError) -> Self {
        use crate::services::templates::TemplatesError;
        match err {
            TemplatesError::InvalidCategory(_) => ApiError::bad_request(err.to_string()),
            TemplatesError::Database(db) => db.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_map_to_expected_statuses() {
        let unknown: ApiError = DatabaseError::UnknownTenant("x".into()).into();
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);

        let misconfigured: ApiError = DatabaseError::MisconfiguredTenant("x".into()).into();
        assert_eq!(misconfigured.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let not_connected: ApiError = DatabaseError::NotConnected("x".into()).into();
        assert_eq!(not_connected.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let connect_failure: ApiError = DatabaseError::ConnectFailure {
            tenant: "x".into(),
            source: sqlx::Error::PoolClosed,
        }
        .into();
        assert_eq!(connect_failure.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn sql_detail_is_withheld_from_clients() {
        let err: ApiError = DatabaseError::Sqlx(sqlx::Error::RowNotFound).into();
        assert!(!err.message().to_lowercase().contains("row"));
        assert_eq!(err.to_json()["success"], false);
    }
}
