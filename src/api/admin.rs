//! Admin surface: word queue, settings, user management, manual
//! rotation/reset triggers. Every handler requires an admin session.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

use crate::auth::Session;
use crate::db::AppState;
use crate::domain::DomainError;
use crate::game::{progression, settings, stats};
use crate::models::{coupon, game_state, submission, user, word};

pub async fn list_words(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    let words = word::Entity::find()
        .order_by_asc(word::Column::Id)
        .all(db)
        .await?;
    let active_id = game_state::Entity::find_by_id(1)
        .one(db)
        .await?
        .and_then(|s| s.current_word_id);
    let default = settings::default_required_completions(db).await?;

    let mut out = Vec::with_capacity(words.len());
    for w in words {
        let count = submission::Entity::find()
            .filter(submission::Column::WordId.eq(w.id))
            .count(db)
            .await?;
        out.push(json!({
            "id": w.id,
            "word": w.word,
            "createdAt": w.created_at,
            "requiredCompletions": w.required_completions.unwrap_or(default),
            "hasOverride": w.required_completions.is_some(),
            "currentCompletions": count,
            "isActive": active_id == Some(w.id),
        }));
    }

    Ok(Json(out))
}

#[derive(Deserialize)]
pub struct CreateWordRequest {
    word: String,
}

pub async fn create_word(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateWordRequest>,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;

    let text = payload.word.trim().to_lowercase();
    if text.is_empty() {
        return Err(DomainError::Validation("Word must not be empty".to_string()));
    }

    let model = word::ActiveModel {
        word: Set(text),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        required_completions: Set(None),
        ..Default::default()
    };
    let created = model.insert(&state.conn).await.map_err(|e| {
        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            DomainError::Conflict("Word already exists".to_string())
        } else {
            DomainError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWordRequest {
    /// None clears the override back to the global default
    required_completions: Option<i32>,
}

pub async fn update_word(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateWordRequest>,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;

    if let Some(n) = payload.required_completions {
        if !(1..=20).contains(&n) {
            return Err(DomainError::Validation(
                "Required completions must be between 1 and 20".to_string(),
            ));
        }
    }

    let found = word::Entity::find_by_id(id)
        .one(&state.conn)
        .await?
        .ok_or_else(|| DomainError::NotFound("Word not found".to_string()))?;

    let mut updated: word::ActiveModel = found.into();
    updated.required_completions = Set(payload.required_completions);
    let saved = updated.update(&state.conn).await?;

    Ok(Json(saved))
}

pub async fn delete_word(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    let active_id = game_state::Entity::find_by_id(1)
        .one(db)
        .await?
        .and_then(|s| s.current_word_id);
    if active_id == Some(id) {
        return Err(DomainError::Conflict(
            "Cannot remove the active word".to_string(),
        ));
    }

    let res = word::Entity::delete_by_id(id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(DomainError::NotFound("Word not found".to_string()));
    }

    Ok(Json(json!({ "message": "Word deleted" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateWordRequest {
    word_id: i32,
}

pub async fn activate_word(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ActivateWordRequest>,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;

    let activated = progression::activate_word(&state.conn, payload.word_id).await?;
    Ok(Json(json!({
        "message": "Word activated",
        "word": activated,
    })))
}

pub async fn rotate_word(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    let active = progression::active_word(db).await?;
    let next = progression::rotate(db, active.word.id).await?;

    Ok(Json(json!({
        "message": "Word rotated",
        "nextWord": next.map(|w| w.word),
    })))
}

pub async fn reset_cycle(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;

    let next = progression::cycle_reset(&state.conn).await?;
    Ok(Json(json!({
        "message": "Cycle reset; all sessions issued before now are invalidated",
        "nextWord": next.word,
    })))
}

pub async fn get_settings(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    let (open, close) = settings::booth_hours(db).await?;
    Ok(Json(json!({
        "couponDropRate": settings::coupon_drop_rate(db).await?,
        "defaultRequiredCompletions": settings::default_required_completions(db).await?,
        "boothOpenTime": open.format("%H:%M").to_string(),
        "boothCloseTime": close.format("%H:%M").to_string(),
        "boothUtcOffsetMinutes": settings::booth_utc_offset_minutes(db).await?,
        "lastResetTime": settings::last_reset_time(db).await?.map(|t| t.to_rfc3339()),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    coupon_drop_rate: Option<i32>,
    default_required_completions: Option<i32>,
    booth_open_time: Option<String>,
    booth_close_time: Option<String>,
    booth_utc_offset_minutes: Option<i32>,
}

pub async fn update_settings(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    if let Some(rate) = payload.coupon_drop_rate {
        if !(0..=100).contains(&rate) {
            return Err(DomainError::Validation(
                "Coupon drop rate must be between 0 and 100".to_string(),
            ));
        }
        settings::set(db, settings::COUPON_DROP_RATE, &rate.to_string()).await?;
    }

    if let Some(n) = payload.default_required_completions {
        if !(1..=20).contains(&n) {
            return Err(DomainError::Validation(
                "Default required completions must be between 1 and 20".to_string(),
            ));
        }
        settings::set(db, settings::DEFAULT_REQUIRED_COMPLETIONS, &n.to_string()).await?;
    }

    if let Some(open) = &payload.booth_open_time {
        settings::parse_hhmm(open)?;
        settings::set(db, settings::BOOTH_OPEN_TIME, open).await?;
    }

    if let Some(close) = &payload.booth_close_time {
        settings::parse_hhmm(close)?;
        settings::set(db, settings::BOOTH_CLOSE_TIME, close).await?;
    }

    if let Some(offset) = payload.booth_utc_offset_minutes {
        if !(-720..=840).contains(&offset) {
            return Err(DomainError::Validation(
                "UTC offset must be between -720 and 840 minutes".to_string(),
            ));
        }
        settings::set(db, settings::BOOTH_UTC_OFFSET_MINUTES, &offset.to_string()).await?;
    }

    Ok(Json(json!({ "success": true, "message": "Settings updated" })))
}

pub async fn list_users(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    Ok(Json(stats::all_user_stats(&state.conn).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    let found = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::NotFound("User not found".to_string()))?;
    if found.is_admin {
        return Err(DomainError::Forbidden(
            "Cannot delete an admin account".to_string(),
        ));
    }

    // Explicit cascade, not relying on foreign_keys pragma
    let txn = db.begin().await?;
    submission::Entity::delete_many()
        .filter(submission::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    coupon::Entity::delete_many()
        .filter(coupon::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    user::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = id, username = %found.username, "user deleted by admin");
    Ok(Json(json!({ "message": "User deleted" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;

    if payload.new_password.len() < 6 {
        return Err(DomainError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let found = user::Entity::find_by_id(id)
        .one(&state.conn)
        .await?
        .ok_or_else(|| DomainError::NotFound("User not found".to_string()))?;

    let mut updated: user::ActiveModel = found.into();
    updated.password_hash = Set(crate::auth::hash_password(&payload.new_password)?);
    updated.update(&state.conn).await?;

    Ok(Json(json!({ "message": "Password reset" })))
}

pub async fn admin_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    Ok(Json(json!({
        "users": stats::all_user_stats(db).await?,
        "coupons": stats::all_coupons(db).await?,
    })))
}

/// Full data wipe: submissions, coupons and player accounts go; words,
/// settings and admin accounts stay. Stamps the reset time so every
/// outstanding session is forced out.
pub async fn wipe_data(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    session.require_admin()?;
    let db = &state.conn;

    let txn = db.begin().await?;
    submission::Entity::delete_many().exec(&txn).await?;
    coupon::Entity::delete_many().exec(&txn).await?;
    user::Entity::delete_many()
        .filter(user::Column::IsAdmin.eq(false))
        .exec(&txn)
        .await?;
    settings::mark_reset(&txn).await?;
    txn.commit().await?;

    tracing::warn!("full data wipe executed");
    Ok(Json(json!({ "message": "All game data wiped" })))
}
