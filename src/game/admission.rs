//! Submission admission controller.
//!
//! Gates one user's attempt to complete the active word: eligibility
//! checks fail fast before any write, the classifier verdict decides
//! whether anything is recorded, and on success the submission and an
//! optional coupon land in one transaction before progression is
//! re-evaluated.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;

use crate::classifier::{Classifier, Verdict};
use crate::domain::DomainError;
use crate::game::{coupons, hours, progression, settings};
use crate::models::{submission, user, word};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub success: bool,
    pub points: i32,
    pub confidence: i32,
    pub got_coupon: bool,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_submitted: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_screen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub word_progressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_word: Option<String>,
}

impl SubmitOutcome {
    fn already_submitted(word: &str) -> Self {
        Self {
            success: false,
            points: 0,
            confidence: 0,
            got_coupon: false,
            message: format!("You've already found \"{}\"! Wait for the next word.", word),
            already_submitted: true,
            is_screen: false,
            explanation: None,
            word_progressed: false,
            next_word: None,
        }
    }

    fn rejected(word: &str, verdict: &Verdict) -> Self {
        let message = if verdict.is_screen_capture {
            "Photo appears to be taken of a screen. Please take a photo of the real object!"
                .to_string()
        } else {
            format!("This image doesn't appear to contain \"{}\". Try again!", word)
        };
        Self {
            success: false,
            points: 0,
            confidence: verdict.confidence,
            got_coupon: false,
            message,
            already_submitted: false,
            is_screen: verdict.is_screen_capture,
            explanation: verdict.explanation.clone(),
            word_progressed: false,
            next_word: None,
        }
    }
}

/// Base point plus a confidence bonus: 0-19 -> 1, 20-39 -> 2, ..., 100 -> 6.
pub fn points_for(confidence: i32) -> i32 {
    1 + confidence.clamp(0, 100) / 20
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub async fn submit(
    db: &DatabaseConnection,
    classifier: &Classifier,
    user: &user::Model,
    image: &str,
    tz_offset_minutes: Option<i32>,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, DomainError> {
    // Admins run the booth; they don't play it
    if user.is_admin {
        return Err(DomainError::Forbidden(
            "Admin accounts cannot participate in the game".to_string(),
        ));
    }

    let offset = match tz_offset_minutes {
        Some(m) => m,
        None => settings::booth_utc_offset_minutes(db).await?,
    };
    let (open, close) = settings::booth_hours(db).await?;
    let local = (now + Duration::minutes(offset as i64)).time();
    if !hours::is_open(open, close, local) {
        return Err(DomainError::BoothClosed);
    }

    let active = progression::active_word(db).await?;

    let existing = submission::Entity::find()
        .filter(submission::Column::UserId.eq(user.id))
        .filter(submission::Column::WordId.eq(active.word.id))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(SubmitOutcome::already_submitted(&active.word.word));
    }

    // Nothing is written until the classifier says pass; a screen capture
    // always loses, even against a pass verdict.
    let verdict = classifier.classify(image, &active.word.word).await?;
    if verdict.is_screen_capture || !verdict.pass {
        return Ok(SubmitOutcome::rejected(&active.word.word, &verdict));
    }

    let points = points_for(verdict.confidence);
    let drop_rate = settings::coupon_drop_rate(db).await?;
    let got_coupon = rand::thread_rng().gen_range(0..100) < drop_rate;

    let txn = db.begin().await?;
    let row = submission::ActiveModel {
        user_id: Set(user.id),
        word_id: Set(active.word.id),
        word: Set(active.word.word.clone()),
        points: Set(points),
        confidence: Set(verdict.confidence),
        created_at: Set(now.to_rfc3339()),
        ..Default::default()
    };
    match submission::Entity::insert(row).exec(&txn).await {
        Ok(_) => {}
        // Race against a concurrent submit by the same user: the unique
        // constraint is the arbiter, not a hard error
        Err(e) if is_unique_violation(&e) => {
            txn.rollback().await?;
            return Ok(SubmitOutcome::already_submitted(&active.word.word));
        }
        Err(e) => return Err(e.into()),
    }

    if got_coupon {
        coupons::mint(&txn, user.id, &active.word.word, now).await?;
    }
    txn.commit().await?;

    let next = progression::evaluate_completion(db, active.word.id).await?;

    Ok(SubmitOutcome {
        success: true,
        points,
        confidence: verdict.confidence,
        got_coupon,
        message: format!("Great! Found \"{}\" in your photo!", active.word.word),
        already_submitted: false,
        is_screen: false,
        explanation: verdict.explanation,
        word_progressed: next.is_some(),
        next_word: next.map(|w: word::Model| w.word),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_follow_confidence_buckets() {
        assert_eq!(points_for(0), 1);
        assert_eq!(points_for(19), 1);
        assert_eq!(points_for(20), 2);
        assert_eq!(points_for(39), 2);
        assert_eq!(points_for(85), 5);
        assert_eq!(points_for(99), 5);
        assert_eq!(points_for(100), 6);
    }

    #[test]
    fn points_clamp_out_of_range_confidence() {
        assert_eq!(points_for(-5), 1);
        assert_eq!(points_for(250), 6);
    }
}
