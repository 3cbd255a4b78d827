use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{create_jwt, hash_password, verify_password, Session};
use crate::db::AppState;
use crate::domain::DomainError;
use crate::models::user;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

fn validate_credentials(username: &str, password: &str) -> Result<(), DomainError> {
    if username.trim().len() < MIN_USERNAME_LEN {
        return Err(DomainError::Validation(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

async fn insert_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    is_admin: bool,
) -> Result<user::Model, DomainError> {
    let now = chrono::Utc::now().to_rfc3339();
    let model = user::ActiveModel {
        username: Set(username.trim().to_string()),
        password_hash: Set(hash_password(password)?),
        is_admin: Set(is_admin),
        created_at: Set(now.clone()),
        last_active: Set(now),
        ..Default::default()
    };

    model.insert(db).await.map_err(|e| {
        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            DomainError::Conflict("Username already taken".to_string())
        } else {
            e.into()
        }
    })
}

fn login_response(user: &user::Model, is_new_user: bool) -> Result<impl IntoResponse, DomainError> {
    let token = create_jwt(user.id, &user.username, user.is_admin)?;
    Ok(Json(json!({
        "id": user.id,
        "username": user.username,
        "created_at": user.created_at,
        "isNewUser": is_new_user,
        "isAdmin": user.is_admin,
        "token": token,
    })))
}

/// Login doubles as registration: an unseen username creates an account
/// with the supplied password.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, DomainError> {
    validate_credentials(&payload.username, &payload.password)?;
    let db = &state.conn;

    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(payload.username.trim()))
        .one(db)
        .await?;

    match existing {
        Some(found) => {
            if !verify_password(&payload.password, &found.password_hash)? {
                tracing::warn!(username = %found.username, "login with wrong password");
                return Err(DomainError::Auth(
                    "Wrong password for existing username".to_string(),
                ));
            }

            let mut touched: user::ActiveModel = found.clone().into();
            touched.last_active = Set(chrono::Utc::now().to_rfc3339());
            touched.update(db).await?;

            tracing::info!(username = %found.username, "login");
            login_response(&found, false)
        }
        None => {
            let created = insert_user(db, &payload.username, &payload.password, false).await?;
            tracing::info!(username = %created.username, "auto-registered new player");
            login_response(&created, true)
        }
    }
}

/// Explicit registration; duplicate usernames are a 409 here rather than
/// a password check.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, DomainError> {
    validate_credentials(&payload.username, &payload.password)?;

    let created = insert_user(&state.conn, &payload.username, &payload.password, false).await?;
    tracing::info!(username = %created.username, "registered new player");

    let response = login_response(&created, true)?;
    Ok((StatusCode::CREATED, response))
}

pub async fn get_me(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    let found = user::Entity::find_by_id(session.user_id()?)
        .one(&state.conn)
        .await?
        .ok_or_else(|| DomainError::NotFound("User not found".to_string()))?;

    Ok(Json(found))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, DomainError> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let db = &state.conn;
    let found = user::Entity::find_by_id(session.user_id()?)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.current_password, &found.password_hash)? {
        return Err(DomainError::Auth("Current password is incorrect".to_string()));
    }

    let mut updated: user::ActiveModel = found.into();
    updated.password_hash = Set(hash_password(&payload.new_password)?);
    updated.update(db).await?;

    Ok(Json(json!({ "success": true, "message": "Password updated" })))
}
