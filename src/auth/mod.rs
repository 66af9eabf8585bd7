use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// JWT claims for a back-office admin session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(admin: &AdminUser, expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: admin.id.clone(),
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role.clone(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Token error: {0}")]
    Token(String),
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &key).map_err(|e| AuthError::Token(e.to_string()))
}

pub fn decode_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default())
        .map_err(|e| AuthError::Token(e.to_string()))?;
    Ok(data.claims)
}

/// One back-office admin account. These are the operators of the admin panel,
/// not users of the managed apps.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub password_hash: String,
}

/// Public projection of an admin (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<&AdminUser> for AdminProfile {
    fn from(a: &AdminUser) -> Self {
        Self {
            id: a.id.clone(),
            email: a.email.clone(),
            name: a.name.clone(),
            role: a.role.clone(),
        }
    }
}

/// Directory of admin accounts, loaded from the environment at startup.
///
/// Admins live in configuration rather than in any tenant database: the back
/// office must stay reachable even when every app database is down.
#[derive(Debug, Default)]
pub struct AdminDirectory {
    admins: Vec<AdminUser>,
}

impl AdminDirectory {
    pub fn new(admins: Vec<AdminUser>) -> Self {
        Self { admins }
    }

    /// Load admins from ADMIN_{n}_* environment variables, starting at n = 1
    /// and stopping at the first index with no ADMIN_{n}_EMAIL set.
    pub fn from_env() -> Self {
        let mut admins = Vec::new();
        for n in 1.. {
            let email = match std::env::var(format!("ADMIN_{}_EMAIL", n)) {
                Ok(v) if !v.trim().is_empty() => v.trim().to_lowercase(),
                _ => break,
            };
            let password_hash = std::env::var(format!("ADMIN_{}_PASSWORD_HASH", n)).unwrap_or_default();
            let name = std::env::var(format!("ADMIN_{}_NAME", n)).unwrap_or_else(|_| email.clone());
            let role = std::env::var(format!("ADMIN_{}_ROLE", n)).unwrap_or_else(|_| "admin".to_string());

            admins.push(AdminUser {
                id: n.to_string(),
                email,
                name,
                role,
                password_hash,
            });
        }

        tracing::info!(admins = admins.len(), "Loaded admin directory from environment");
        Self { admins }
    }

    pub fn find_by_email(&self, email: &str) -> Option<&AdminUser> {
        let email = email.to_lowercase();
        self.admins.iter().find(|a| a.email == email)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&AdminUser> {
        self.admins.iter().find(|a| a.id == id)
    }

    /// Verify credentials and mint a session token.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<(String, AdminProfile), AuthError> {
        let admin = self.find_by_email(email).ok_or(AuthError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &admin.password_hash).unwrap_or(false);
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let claims = Claims::new(admin, security.jwt_expiry_hours);
        let token = generate_jwt(&claims, security)?;
        Ok((token, AdminProfile::from(admin)))
    }
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}
