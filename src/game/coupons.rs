//! Coupon lifecycle: minting alongside a qualifying submission, and the
//! one-way pending -> confirmed transition.

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr};

use crate::domain::DomainError;
use crate::models::coupon;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_ATTEMPTS: usize = 5;

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("YCC-{}", suffix)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Mint a pending coupon with a fresh unique code. Code collisions are
/// redrawn a few times before giving up.
pub async fn mint<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    word: &str,
    now: DateTime<Utc>,
) -> Result<coupon::Model, DomainError> {
    let mut last_err = None;
    for _ in 0..CODE_ATTEMPTS {
        let row = coupon::ActiveModel {
            user_id: Set(user_id),
            word: Set(word.to_string()),
            coupon_code: Set(generate_code()),
            status: Set(coupon::STATUS_PENDING.to_string()),
            prize_description: Set("Special booth prize".to_string()),
            created_at: Set(now.to_rfc3339()),
            confirmed_at: Set(None),
            ..Default::default()
        };
        match row.insert(conn).await {
            Ok(model) => return Ok(model),
            Err(e) if is_unique_violation(&e) => last_err = Some(e),
            Err(e) => return Err(e.into()),
        }
    }
    Err(DomainError::Database(format!(
        "Could not mint a unique coupon code: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Transition a coupon pending -> confirmed. Only the owning user, only
/// while pending. Returns false when nothing matched, so re-confirming
/// is a no-op failure rather than a second state change.
pub async fn confirm<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    coupon_id: i32,
) -> Result<bool, DomainError> {
    let res = coupon::Entity::update_many()
        .col_expr(
            coupon::Column::Status,
            Expr::value(coupon::STATUS_CONFIRMED),
        )
        .col_expr(
            coupon::Column::ConfirmedAt,
            Expr::value(Some(Utc::now().to_rfc3339())),
        )
        .filter(coupon::Column::Id.eq(coupon_id))
        .filter(coupon::Column::UserId.eq(user_id))
        .filter(coupon::Column::Status.eq(coupon::STATUS_PENDING))
        .exec(conn)
        .await?;

    Ok(res.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_expected_shape() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 12);
            assert!(code.starts_with("YCC-"));
            assert!(code[4..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}
