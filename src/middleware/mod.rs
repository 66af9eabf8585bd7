pub mod auth;
pub mod tenant;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use tenant::{tenant_selector_middleware, CurrentTenant, APP_ID_HEADER};
