//! Typed access to the flat key/value settings store.

use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, EntityTrait, Set};

use crate::domain::DomainError;
use crate::models::setting;

pub const COUPON_DROP_RATE: &str = "coupon_drop_rate";
pub const DEFAULT_REQUIRED_COMPLETIONS: &str = "default_required_completions";
pub const BOOTH_OPEN_TIME: &str = "booth_open_time";
pub const BOOTH_CLOSE_TIME: &str = "booth_close_time";
pub const BOOTH_UTC_OFFSET_MINUTES: &str = "booth_utc_offset_minutes";
pub const LAST_RESET_TIME: &str = "last_reset_time";

pub const DEFAULT_COUPON_DROP_RATE: i32 = 30;
pub const DEFAULT_COMPLETIONS: i32 = 5;
pub const DEFAULT_OPEN_TIME: &str = "09:00";
pub const DEFAULT_CLOSE_TIME: &str = "18:00";

pub async fn get<C: ConnectionTrait>(conn: &C, key: &str) -> Result<Option<String>, DomainError> {
    Ok(setting::Entity::find_by_id(key.to_owned())
        .one(conn)
        .await?
        .map(|s| s.value))
}

pub async fn set<C: ConnectionTrait>(conn: &C, key: &str, value: &str) -> Result<(), DomainError> {
    let model = setting::ActiveModel {
        key: Set(key.to_owned()),
        value: Set(value.to_owned()),
        updated_at: Set(Utc::now().to_rfc3339()),
    };

    setting::Entity::insert(model)
        .on_conflict(
            OnConflict::column(setting::Column::Key)
                .update_columns([setting::Column::Value, setting::Column::UpdatedAt])
                .to_owned(),
        )
        .exec(conn)
        .await?;
    Ok(())
}

/// Coupon award probability in percent, 0-100.
pub async fn coupon_drop_rate<C: ConnectionTrait>(conn: &C) -> Result<i32, DomainError> {
    Ok(get(conn, COUPON_DROP_RATE)
        .await?
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_COUPON_DROP_RATE)
        .clamp(0, 100))
}

/// Completions needed before a word rotates, for words without an override.
pub async fn default_required_completions<C: ConnectionTrait>(
    conn: &C,
) -> Result<i32, DomainError> {
    Ok(get(conn, DEFAULT_REQUIRED_COMPLETIONS)
        .await?
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_COMPLETIONS)
        .max(1))
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| DomainError::Validation(format!("Invalid time of day: {}", value)))
}

/// Booth operating window as (open, close) times of day.
pub async fn booth_hours<C: ConnectionTrait>(
    conn: &C,
) -> Result<(NaiveTime, NaiveTime), DomainError> {
    let open = get(conn, BOOTH_OPEN_TIME)
        .await?
        .unwrap_or_else(|| DEFAULT_OPEN_TIME.to_string());
    let close = get(conn, BOOTH_CLOSE_TIME)
        .await?
        .unwrap_or_else(|| DEFAULT_CLOSE_TIME.to_string());
    Ok((parse_hhmm(&open)?, parse_hhmm(&close)?))
}

/// Configured display timezone, as minutes east of UTC. Callers may
/// override per-request via the x-tz-offset header.
pub async fn booth_utc_offset_minutes<C: ConnectionTrait>(conn: &C) -> Result<i32, DomainError> {
    Ok(get(conn, BOOTH_UTC_OFFSET_MINUTES)
        .await?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

/// Timestamp of the last full-cycle reset; None means "never reset".
pub async fn last_reset_time<C: ConnectionTrait>(
    conn: &C,
) -> Result<Option<DateTime<Utc>>, DomainError> {
    match get(conn, LAST_RESET_TIME).await? {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|_| {
                DomainError::Database(format!("Corrupt last_reset_time: {}", raw))
            })?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

pub async fn mark_reset<C: ConnectionTrait>(conn: &C) -> Result<(), DomainError> {
    set(conn, LAST_RESET_TIME, &Utc::now().to_rfc3339()).await
}
