//! Leaderboard and per-user rollups.
//!
//! Totals are aggregated from the submission and coupon tables on every
//! read. Write volume is booth-scale, so recompute-on-read keeps the
//! leaderboard trivially consistent with the underlying rows.

use sea_orm::{ConnectionTrait, Statement};
use serde::Serialize;

use crate::domain::DomainError;

pub const MAX_LEADERBOARD_LIMIT: u64 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct UserScore {
    pub user_id: i32,
    pub username: String,
    pub total_points: i64,
    pub total_coupons: i64,
    pub words_completed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUserRow {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
    pub last_active: String,
    pub total_points: i64,
    pub total_coupons: i64,
    pub words_completed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminCouponRow {
    pub id: i32,
    pub coupon_code: String,
    pub word: String,
    pub status: String,
    pub created_at: String,
    pub confirmed_at: Option<String>,
    pub username: String,
}

// Subqueries rather than a double LEFT JOIN so the coupon count cannot
// multiply the points sum.
const SCORE_COLUMNS: &str = r#"
    u.id AS id,
    u.username AS username,
    COALESCE((SELECT SUM(s.points) FROM submissions s WHERE s.user_id = u.id), 0) AS total_points,
    (SELECT COUNT(*) FROM coupons c WHERE c.user_id = u.id) AS total_coupons,
    (SELECT COUNT(DISTINCT s.word_id) FROM submissions s WHERE s.user_id = u.id) AS words_completed
"#;

/// Non-admin users ranked by points, then coupons, then distinct words.
pub async fn leaderboard<C: ConnectionTrait>(
    conn: &C,
    limit: u64,
) -> Result<Vec<UserScore>, DomainError> {
    let limit = limit.clamp(1, MAX_LEADERBOARD_LIMIT) as i64;
    let sql = format!(
        r#"
        SELECT {SCORE_COLUMNS}
        FROM users u
        WHERE u.is_admin = 0
        ORDER BY total_points DESC, total_coupons DESC, words_completed DESC
        LIMIT ?
        "#
    );

    let rows = conn
        .query_all(Statement::from_sql_and_values(
            conn.get_database_backend(),
            &sql,
            [limit.into()],
        ))
        .await?;

    rows.iter()
        .map(|row| {
            Ok(UserScore {
                user_id: row.try_get("", "id")?,
                username: row.try_get("", "username")?,
                total_points: row.try_get("", "total_points")?,
                total_coupons: row.try_get("", "total_coupons")?,
                words_completed: row.try_get("", "words_completed")?,
            })
        })
        .collect()
}

/// Same aggregation scoped to one user.
pub async fn user_stats<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<UserScore>, DomainError> {
    let sql = format!(
        r#"
        SELECT {SCORE_COLUMNS}
        FROM users u
        WHERE u.id = ?
        "#
    );

    let row = conn
        .query_one(Statement::from_sql_and_values(
            conn.get_database_backend(),
            &sql,
            [user_id.into()],
        ))
        .await?;

    row.map(|row| {
        Ok(UserScore {
            user_id: row.try_get("", "id")?,
            username: row.try_get("", "username")?,
            total_points: row.try_get("", "total_points")?,
            total_coupons: row.try_get("", "total_coupons")?,
            words_completed: row.try_get("", "words_completed")?,
        })
    })
    .transpose()
}

/// Admin view: every account with its rollups, admins included.
pub async fn all_user_stats<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<AdminUserRow>, DomainError> {
    let sql = format!(
        r#"
        SELECT {SCORE_COLUMNS},
               u.is_admin AS is_admin,
               u.created_at AS created_at,
               u.last_active AS last_active
        FROM users u
        ORDER BY total_points DESC
        "#
    );

    let rows = conn
        .query_all(Statement::from_string(conn.get_database_backend(), sql))
        .await?;

    rows.iter()
        .map(|row| {
            Ok(AdminUserRow {
                id: row.try_get("", "id")?,
                username: row.try_get("", "username")?,
                is_admin: row.try_get("", "is_admin")?,
                created_at: row.try_get("", "created_at")?,
                last_active: row.try_get("", "last_active")?,
                total_points: row.try_get("", "total_points")?,
                total_coupons: row.try_get("", "total_coupons")?,
                words_completed: row.try_get("", "words_completed")?,
            })
        })
        .collect()
}

/// Admin view: all coupons with their owning usernames, newest first.
pub async fn all_coupons<C: ConnectionTrait>(conn: &C) -> Result<Vec<AdminCouponRow>, DomainError> {
    let sql = r#"
        SELECT c.id AS id, c.coupon_code AS coupon_code, c.word AS word,
               c.status AS status, c.created_at AS created_at,
               c.confirmed_at AS confirmed_at, u.username AS username
        FROM coupons c
        JOIN users u ON c.user_id = u.id
        ORDER BY c.created_at DESC
        "#;

    let rows = conn
        .query_all(Statement::from_string(
            conn.get_database_backend(),
            sql.to_owned(),
        ))
        .await?;

    rows.iter()
        .map(|row| {
            Ok(AdminCouponRow {
                id: row.try_get("", "id")?,
                coupon_code: row.try_get("", "coupon_code")?,
                word: row.try_get("", "word")?,
                status: row.try_get("", "status")?,
                created_at: row.try_get("", "created_at")?,
                confirmed_at: row.try_get("", "confirmed_at")?,
                username: row.try_get("", "username")?,
            })
        })
        .collect()
}
