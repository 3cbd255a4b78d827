//! Word progression engine.
//!
//! Exactly one word is active at a time, tracked by the single-row
//! game_state table. Rotation happens synchronously inside the request
//! that pushes a word over its completion threshold; when every word has
//! reached its threshold the whole cycle resets (submission history is
//! purged, coupons are kept).

use chrono::Utc;
use rand::seq::SliceRandom;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, Statement, TransactionTrait,
};

use crate::domain::DomainError;
use crate::game::settings;
use crate::models::{game_state, submission, word};

/// The active word together with its live completion progress.
#[derive(Debug, Clone)]
pub struct ActiveWord {
    pub word: word::Model,
    pub submissions: i64,
    pub required: i64,
    pub activated_at: Option<String>,
}

fn effective_threshold(word: &word::Model, default: i32) -> i64 {
    word.required_completions.unwrap_or(default).max(1) as i64
}

async fn load_active<C: ConnectionTrait>(conn: &C) -> Result<Option<ActiveWord>, DomainError> {
    let Some(state) = game_state::Entity::find_by_id(1).one(conn).await? else {
        return Ok(None);
    };
    let Some(word_id) = state.current_word_id else {
        return Ok(None);
    };
    // A dangling pointer (word deleted underneath us) heals like "no word"
    let Some(active) = word::Entity::find_by_id(word_id).one(conn).await? else {
        return Ok(None);
    };

    let submissions = submission::Entity::find()
        .filter(submission::Column::WordId.eq(word_id))
        .count(conn)
        .await? as i64;
    let default = settings::default_required_completions(conn).await?;

    Ok(Some(ActiveWord {
        required: effective_threshold(&active, default),
        word: active,
        submissions,
        activated_at: state.activated_at,
    }))
}

async fn set_active<C: ConnectionTrait>(conn: &C, word_id: i32) -> Result<(), DomainError> {
    let state = game_state::ActiveModel {
        id: Set(1),
        current_word_id: Set(Some(word_id)),
        activated_at: Set(Some(Utc::now().to_rfc3339())),
    };
    game_state::Entity::insert(state)
        .on_conflict(
            OnConflict::column(game_state::Column::Id)
                .update_columns([
                    game_state::Column::CurrentWordId,
                    game_state::Column::ActivatedAt,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;
    Ok(())
}

/// Words whose submission count is strictly below their threshold,
/// picked uniformly at random in Rust rather than via ORDER BY RANDOM().
async fn pick_under_threshold<C: ConnectionTrait>(
    conn: &C,
    exclude: Option<i32>,
) -> Result<Option<i32>, DomainError> {
    let default = settings::default_required_completions(conn).await?;
    let backend = conn.get_database_backend();

    let stmt = match exclude {
        Some(id) => Statement::from_sql_and_values(
            backend,
            r#"
            SELECT w.id AS id FROM words w
            LEFT JOIN submissions s ON s.word_id = w.id
            WHERE w.id <> ?
            GROUP BY w.id
            HAVING COUNT(s.id) < COALESCE(w.required_completions, ?)
            "#,
            [id.into(), default.into()],
        ),
        None => Statement::from_sql_and_values(
            backend,
            r#"
            SELECT w.id AS id FROM words w
            LEFT JOIN submissions s ON s.word_id = w.id
            GROUP BY w.id
            HAVING COUNT(s.id) < COALESCE(w.required_completions, ?)
            "#,
            [default.into()],
        ),
    };

    let rows = conn.query_all(stmt).await?;
    let ids = rows
        .iter()
        .map(|row| row.try_get::<i32>("", "id"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ids.choose(&mut rand::thread_rng()).copied())
}

async fn any_word<C: ConnectionTrait>(conn: &C) -> Result<Option<i32>, DomainError> {
    let words = word::Entity::find().all(conn).await?;
    Ok(words.choose(&mut rand::thread_rng()).map(|w| w.id))
}

/// The single globally-active word plus its progress. Self-heals: if no
/// word is active (first boot, or the active word was deleted) one is
/// activated before returning. Fails with `NoWordsAvailable` when the
/// word table is empty.
pub async fn active_word(db: &DatabaseConnection) -> Result<ActiveWord, DomainError> {
    if let Some(active) = load_active(db).await? {
        return Ok(active);
    }

    let txn = db.begin().await?;
    if load_active(&txn).await?.is_none() {
        let candidate = match pick_under_threshold(&txn, None).await? {
            Some(id) => id,
            None => any_word(&txn).await?.ok_or(DomainError::NoWordsAvailable)?,
        };
        set_active(&txn, candidate).await?;
        tracing::info!(word_id = candidate, "self-healed missing active word");
    }
    txn.commit().await?;

    load_active(db)
        .await?
        .ok_or_else(|| DomainError::Database("game state missing after activation".to_string()))
}

/// Called after every successful submission write. Rotates when the
/// word's count has reached its threshold; returns the newly activated
/// word when rotation happened.
pub async fn evaluate_completion(
    db: &DatabaseConnection,
    word_id: i32,
) -> Result<Option<word::Model>, DomainError> {
    let Some(current) = word::Entity::find_by_id(word_id).one(db).await? else {
        return Ok(None);
    };

    let count = submission::Entity::find()
        .filter(submission::Column::WordId.eq(word_id))
        .count(db)
        .await? as i64;
    let default = settings::default_required_completions(db).await?;

    if count >= effective_threshold(&current, default) {
        rotate(db, word_id).await
    } else {
        Ok(None)
    }
}

/// Rotate away from `from_word_id`. The whole deactivate/activate pair is
/// one transaction, and the "is this word still active" re-check makes a
/// concurrent second rotation a safe no-op rather than a double rotation.
pub async fn rotate(
    db: &DatabaseConnection,
    from_word_id: i32,
) -> Result<Option<word::Model>, DomainError> {
    let txn = db.begin().await?;

    let current = game_state::Entity::find_by_id(1)
        .one(&txn)
        .await?
        .and_then(|s| s.current_word_id);
    if current != Some(from_word_id) {
        // Lost the race; someone else already rotated
        txn.commit().await?;
        return Ok(None);
    }

    let next_id = match pick_under_threshold(&txn, Some(from_word_id)).await? {
        Some(id) => id,
        None => {
            // Full cycle: every word has reached its threshold. Purge the
            // submission history (coupons stay), stamp the reset time so
            // stale sessions get invalidated, and start over.
            submission::Entity::delete_many().exec(&txn).await?;
            settings::mark_reset(&txn).await?;
            tracing::info!("full cycle completed, submission history reset");
            any_word(&txn).await?.ok_or(DomainError::NoWordsAvailable)?
        }
    };

    set_active(&txn, next_id).await?;
    let next = word::Entity::find_by_id(next_id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::Database("activated word vanished".to_string()))?;
    txn.commit().await?;

    tracing::info!(from = from_word_id, to = next.id, word = %next.word, "word rotated");
    Ok(Some(next))
}

/// Admin escape hatch: activate a specific word unconditionally,
/// bypassing the threshold logic.
pub async fn activate_word(
    db: &DatabaseConnection,
    word_id: i32,
) -> Result<word::Model, DomainError> {
    let target = word::Entity::find_by_id(word_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::NotFound("Word not found".to_string()))?;

    set_active(db, word_id).await?;
    tracing::info!(word_id, word = %target.word, "word activated by admin");
    Ok(target)
}

/// Admin trigger: force a full-cycle reset right now.
pub async fn cycle_reset(db: &DatabaseConnection) -> Result<word::Model, DomainError> {
    let txn = db.begin().await?;

    submission::Entity::delete_many().exec(&txn).await?;
    settings::mark_reset(&txn).await?;

    let next_id = any_word(&txn).await?.ok_or(DomainError::NoWordsAvailable)?;
    set_active(&txn, next_id).await?;
    let next = word::Entity::find_by_id(next_id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::Database("activated word vanished".to_string()))?;
    txn.commit().await?;

    tracing::info!(word_id = next.id, "manual cycle reset");
    Ok(next)
}
