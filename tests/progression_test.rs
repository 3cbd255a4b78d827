//! Word progression engine tests: rotation, full-cycle reset, self-healing.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};

use snaphunt::db;
use snaphunt::domain::DomainError;
use snaphunt::game::{coupons, progression, settings};
use snaphunt::models::{game_state, submission, user, word};

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_word(
    db: &DatabaseConnection,
    text: &str,
    required: Option<i32>,
) -> word::Model {
    word::ActiveModel {
        word: Set(text.to_string()),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        required_completions: Set(required),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create word")
}

async fn create_player(db: &DatabaseConnection, username: &str) -> user::Model {
    let now = chrono::Utc::now().to_rfc3339();
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("$argon2id$dummy".to_string()),
        is_admin: Set(false),
        created_at: Set(now.clone()),
        last_active: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user")
}

async fn add_submission(db: &DatabaseConnection, user_id: i32, w: &word::Model) {
    submission::ActiveModel {
        user_id: Set(user_id),
        word_id: Set(w.id),
        word: Set(w.word.clone()),
        points: Set(3),
        confidence: Set(50),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create submission");
}

async fn active_word_id(db: &DatabaseConnection) -> Option<i32> {
    game_state::Entity::find_by_id(1)
        .one(db)
        .await
        .expect("Failed to read game state")
        .and_then(|s| s.current_word_id)
}

async fn submission_count(db: &DatabaseConnection) -> u64 {
    submission::Entity::find()
        .count(db)
        .await
        .expect("Failed to count submissions")
}

#[tokio::test]
async fn active_word_self_heals_on_first_boot() {
    let db = setup_test_db().await;
    create_word(&db, "apple", None).await;
    create_word(&db, "book", None).await;

    assert_eq!(active_word_id(&db).await, None);

    let active = progression::active_word(&db)
        .await
        .expect("Failed to resolve active word");

    assert_eq!(active.submissions, 0);
    assert_eq!(active.required, settings::DEFAULT_COMPLETIONS as i64);
    assert_eq!(active_word_id(&db).await, Some(active.word.id));

    // A second read sticks with the same word
    let again = progression::active_word(&db).await.unwrap();
    assert_eq!(again.word.id, active.word.id);
}

#[tokio::test]
async fn active_word_fails_on_empty_word_table() {
    let db = setup_test_db().await;

    let err = progression::active_word(&db).await.unwrap_err();
    assert!(matches!(err, DomainError::NoWordsAvailable));
}

#[tokio::test]
async fn evaluate_below_threshold_is_a_noop() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple", None).await;
    create_word(&db, "book", None).await;
    progression::activate_word(&db, apple.id).await.unwrap();

    let player = create_player(&db, "alice").await;
    add_submission(&db, player.id, &apple).await;

    let rotated = progression::evaluate_completion(&db, apple.id)
        .await
        .unwrap();
    assert!(rotated.is_none());
    assert_eq!(active_word_id(&db).await, Some(apple.id));
}

#[tokio::test]
async fn word_rotates_when_threshold_reached() {
    let db = setup_test_db().await;
    settings::set(&db, settings::DEFAULT_REQUIRED_COMPLETIONS, "2")
        .await
        .unwrap();

    let apple = create_word(&db, "apple", None).await;
    let book = create_word(&db, "book", None).await;
    progression::activate_word(&db, apple.id).await.unwrap();

    let alice = create_player(&db, "alice").await;
    let bob = create_player(&db, "bob").await;

    add_submission(&db, alice.id, &apple).await;
    assert!(progression::evaluate_completion(&db, apple.id)
        .await
        .unwrap()
        .is_none());

    add_submission(&db, bob.id, &apple).await;
    let next = progression::evaluate_completion(&db, apple.id)
        .await
        .unwrap()
        .expect("threshold reached, rotation expected");

    assert_eq!(next.id, book.id);
    assert_eq!(active_word_id(&db).await, Some(book.id));
    // History is kept on a normal rotation
    assert_eq!(submission_count(&db).await, 2);
}

#[tokio::test]
async fn per_word_override_beats_the_default() {
    let db = setup_test_db().await;
    let quick = create_word(&db, "quick", Some(1)).await;
    create_word(&db, "slow", None).await;
    progression::activate_word(&db, quick.id).await.unwrap();

    let alice = create_player(&db, "alice").await;
    add_submission(&db, alice.id, &quick).await;

    let next = progression::evaluate_completion(&db, quick.id)
        .await
        .unwrap();
    assert!(next.is_some());
    assert_ne!(active_word_id(&db).await, Some(quick.id));
}

#[tokio::test]
async fn stale_rotation_attempt_is_a_safe_noop() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple", None).await;
    let book = create_word(&db, "book", None).await;
    progression::activate_word(&db, apple.id).await.unwrap();

    // A concurrent rotation already moved on from "book"
    let res = progression::rotate(&db, book.id).await.unwrap();
    assert!(res.is_none());
    assert_eq!(active_word_id(&db).await, Some(apple.id));
}

#[tokio::test]
async fn full_cycle_triggers_reset_and_keeps_coupons() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple", Some(1)).await;
    let book = create_word(&db, "book", Some(1)).await;
    progression::activate_word(&db, apple.id).await.unwrap();

    let alice = create_player(&db, "alice").await;

    add_submission(&db, alice.id, &apple).await;
    coupons::mint(&db, alice.id, &apple.word, chrono::Utc::now())
        .await
        .unwrap();

    let next = progression::evaluate_completion(&db, apple.id)
        .await
        .unwrap()
        .expect("first rotation");
    assert_eq!(next.id, book.id);
    assert!(settings::last_reset_time(&db).await.unwrap().is_none());

    // Completing the last remaining word closes the cycle
    add_submission(&db, alice.id, &book).await;
    let after_reset = progression::evaluate_completion(&db, book.id)
        .await
        .unwrap()
        .expect("reset must still activate a word");

    assert_eq!(submission_count(&db).await, 0);
    assert!(settings::last_reset_time(&db).await.unwrap().is_some());
    assert_eq!(active_word_id(&db).await, Some(after_reset.id));

    // Coupons survive the purge
    let coupon_count = snaphunt::models::coupon::Entity::find()
        .filter(snaphunt::models::coupon::Column::UserId.eq(alice.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(coupon_count, 1);
}

#[tokio::test]
async fn admin_activation_ignores_completion_counts() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple", Some(1)).await;
    let book = create_word(&db, "book", None).await;
    progression::activate_word(&db, book.id).await.unwrap();

    let alice = create_player(&db, "alice").await;
    add_submission(&db, alice.id, &apple).await; // apple is "done"

    let activated = progression::activate_word(&db, apple.id).await.unwrap();
    assert_eq!(activated.id, apple.id);
    assert_eq!(active_word_id(&db).await, Some(apple.id));
}

#[tokio::test]
async fn activating_unknown_word_is_not_found() {
    let db = setup_test_db().await;
    create_word(&db, "apple", None).await;

    let err = progression::activate_word(&db, 9999).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn manual_cycle_reset_purges_history() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple", None).await;
    progression::activate_word(&db, apple.id).await.unwrap();

    let alice = create_player(&db, "alice").await;
    add_submission(&db, alice.id, &apple).await;

    let next = progression::cycle_reset(&db).await.unwrap();

    assert_eq!(submission_count(&db).await, 0);
    assert!(settings::last_reset_time(&db).await.unwrap().is_some());
    assert_eq!(active_word_id(&db).await, Some(next.id));
}
