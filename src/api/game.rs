use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use base64::Engine;
use chrono::{Duration, Utc};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

use crate::auth::Session;
use crate::db::AppState;
use crate::domain::DomainError;
use crate::game::{admission, coupons, hours, progression, settings, stats};
use crate::models::{coupon, submission, user};

/// Optional per-request timezone override, minutes east of UTC.
fn tz_offset(headers: &HeaderMap) -> Option<i32> {
    headers
        .get("x-tz-offset")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse().ok())
        // Sanity bound: UTC-12..UTC+14
        .filter(|m: &i32| (-720..=840).contains(m))
}

async fn load_player(state: &AppState, session: &Session) -> Result<user::Model, DomainError> {
    user::Entity::find_by_id(session.user_id()?)
        .one(&state.conn)
        .await?
        .ok_or_else(|| DomainError::Auth("User no longer exists".to_string()))
}

pub async fn current_word(
    State(state): State<AppState>,
    _session: Session,
) -> Result<impl IntoResponse, DomainError> {
    let active = progression::active_word(&state.conn).await?;

    let progress = (active.submissions as f64 / active.required as f64).min(1.0);
    Ok(Json(json!({
        "id": active.word.id,
        "word": active.word.word,
        "progress": progress,
        "totalSubmissions": active.submissions,
        "requiredSubmissions": active.required,
        "activatedAt": active.activated_at,
        "isActive": true,
    })))
}

pub async fn submission_status(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    let active = progression::active_word(&state.conn).await?;

    let has_submitted = submission::Entity::find()
        .filter(submission::Column::UserId.eq(session.user_id()?))
        .filter(submission::Column::WordId.eq(active.word.id))
        .count(&state.conn)
        .await?
        > 0;

    Ok(Json(json!({
        "hasSubmitted": has_submitted,
        "currentWord": {
            "id": active.word.id,
            "word": active.word.word,
            "currentCompletions": active.submissions,
            "requiredCompletions": active.required,
        },
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    image_data: String,
}

fn validate_image(image: &str) -> Result<(), DomainError> {
    // Accept both bare base64 and data-URL form
    let payload = image
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(image);

    if payload.trim().is_empty() {
        return Err(DomainError::Validation("Image data is required".to_string()));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| DomainError::Validation("Image data is not valid base64".to_string()))?;
    Ok(())
}

pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, DomainError> {
    validate_image(&payload.image_data)?;

    let player = load_player(&state, &session).await?;

    let outcome = admission::submit(
        &state.conn,
        &state.classifier,
        &player,
        &payload.image_data,
        tz_offset(&headers),
        Utc::now(),
    )
    .await?;

    tracing::info!(
        user = %player.username,
        success = outcome.success,
        points = outcome.points,
        progressed = outcome.word_progressed,
        "photo submission"
    );

    Ok(Json(outcome))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCouponRequest {
    coupon_id: i32,
}

/// Pending -> confirmed, owner only. Re-confirming is a no-op failure,
/// never a second state change.
pub async fn confirm_coupon(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ConfirmCouponRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let confirmed =
        coupons::confirm(&state.conn, session.user_id()?, payload.coupon_id).await?;

    if !confirmed {
        return Err(DomainError::NotFound(
            "Coupon not found or already confirmed".to_string(),
        ));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Coupon confirmed! You can now visit the booth to claim your prize.",
    })))
}

pub async fn user_coupons(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    let coupons = coupon::Entity::find()
        .filter(coupon::Column::UserId.eq(session.user_id()?))
        .order_by_desc(coupon::Column::CreatedAt)
        .all(&state.conn)
        .await?;

    Ok(Json(coupons))
}

pub async fn user_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, DomainError> {
    let score = stats::user_stats(&state.conn, session.user_id()?)
        .await?
        .ok_or_else(|| DomainError::NotFound("User not found".to_string()))?;

    Ok(Json(score))
}

#[derive(Deserialize)]
pub struct LeaderboardParams {
    limit: Option<u64>,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    _session: Session,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, DomainError> {
    let entries = stats::leaderboard(&state.conn, params.limit.unwrap_or(10)).await?;

    let ranked: Vec<_> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            json!({
                "rank": i + 1,
                "username": entry.username,
                "points": entry.total_points,
                "coupons": entry.total_coupons,
                "wordsCompleted": entry.words_completed,
            })
        })
        .collect();

    Ok(Json(ranked))
}

pub async fn booth_status(
    State(state): State<AppState>,
    _session: Session,
    headers: HeaderMap,
) -> Result<impl IntoResponse, DomainError> {
    let db = &state.conn;
    let (open, close) = settings::booth_hours(db).await?;
    let offset = match tz_offset(&headers) {
        Some(m) => m,
        None => settings::booth_utc_offset_minutes(db).await?,
    };

    let now = Utc::now();
    let local = (now + Duration::minutes(offset as i64)).time();

    Ok(Json(json!({
        "isOpen": hours::is_open(open, close, local),
        "openTime": open.format("%H:%M").to_string(),
        "closeTime": close.format("%H:%M").to_string(),
        "currentTime": now.to_rfc3339(),
        "utcOffsetMinutes": offset,
    })))
}
