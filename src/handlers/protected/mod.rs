pub mod aggregate;
pub mod apps;
pub mod auth;
pub mod metrics;
pub mod templates;
pub mod users;
