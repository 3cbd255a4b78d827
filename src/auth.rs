use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::db::AppState;
use crate::domain::DomainError;
use crate::game::session;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub admin: bool,
    pub iat: usize, // issuance time, checked against last_reset_time
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, DomainError> {
        self.sub
            .parse()
            .map_err(|_| DomainError::Auth("Malformed token subject".to_string()))
    }
}

/// Authenticated request context: a decoded token that has also passed
/// the session validity gate (tokens issued before the last cycle reset
/// are rejected, since the reset wiped the submission history their
/// duplicate-prevention relied on).
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: Claims,
}

impl Session {
    pub fn user_id(&self) -> Result<i32, DomainError> {
        self.claims.user_id()
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.claims.admin {
            Ok(())
        } else {
            Err(DomainError::Forbidden("Admin privileges required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = DomainError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| DomainError::Auth("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| DomainError::Auth("Invalid Authorization header format".to_string()))?;

        let claims = decode_jwt(token)
            .map_err(|_| DomainError::Auth("Invalid or expired token".to_string()))?;

        session::ensure_fresh(&state.conn, claims.iat as i64).await?;

        Ok(Session { claims })
    }
}

pub fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DomainError::Database(e.to_string()))?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, DomainError> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| DomainError::Database(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
}

pub fn create_jwt(user_id: i32, username: &str, admin: bool) -> Result<String, DomainError> {
    let secret = get_jwt_secret();
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| DomainError::Database("timestamp overflow".to_string()))?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_owned(),
        admin,
        iat: now.timestamp() as usize,
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| DomainError::Auth(e.to_string()))
}

pub fn decode_jwt(token: &str) -> Result<Claims, DomainError> {
    let secret = get_jwt_secret();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| DomainError::Auth(e.to_string()))
}
