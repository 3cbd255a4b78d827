//! Session validity gate.
//!
//! A full-cycle reset deletes the submission history that duplicate
//! prevention depends on. A token issued before the reset could therefore
//! "re-submit" for a word its user already completed. Tokens issued
//! strictly before the last reset are rejected with a distinct error so
//! clients force a logout instead of retrying.

use chrono::{TimeZone, Utc};
use sea_orm::ConnectionTrait;

use crate::domain::DomainError;
use crate::game::settings;

pub async fn ensure_fresh<C: ConnectionTrait>(
    conn: &C,
    issued_at_unix: i64,
) -> Result<(), DomainError> {
    let Some(reset) = settings::last_reset_time(conn).await? else {
        // Never reset, every token is fresh
        return Ok(());
    };

    let issued = Utc
        .timestamp_opt(issued_at_unix, 0)
        .single()
        .ok_or_else(|| DomainError::Auth("Malformed token issuance time".to_string()))?;

    if issued < reset {
        Err(DomainError::SessionExpired)
    } else {
        Ok(())
    }
}
