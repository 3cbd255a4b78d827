//! Leaderboard aggregation and coupon confirmation.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use snaphunt::db;
use snaphunt::game::{coupons, stats};
use snaphunt::models::{coupon, submission, user, word};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_user(db: &DatabaseConnection, username: &str, is_admin: bool) -> user::Model {
    let now = Utc::now().to_rfc3339();
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("$argon2id$dummy".to_string()),
        is_admin: Set(is_admin),
        created_at: Set(now.clone()),
        last_active: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user")
}

async fn create_word(db: &DatabaseConnection, text: &str) -> word::Model {
    word::ActiveModel {
        word: Set(text.to_string()),
        created_at: Set(Utc::now().to_rfc3339()),
        required_completions: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create word")
}

async fn add_submission(db: &DatabaseConnection, user_id: i32, w: &word::Model, points: i32) {
    submission::ActiveModel {
        user_id: Set(user_id),
        word_id: Set(w.id),
        word: Set(w.word.clone()),
        points: Set(points),
        confidence: Set(50),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create submission");
}

#[tokio::test]
async fn leaderboard_ranks_by_points_then_coupons() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple").await;
    let book = create_word(&db, "book").await;

    let alice = create_user(&db, "alice", false).await;
    let bob = create_user(&db, "bob", false).await;
    let carol = create_user(&db, "carol", false).await;

    // alice and bob tie on points; bob has a coupon
    add_submission(&db, alice.id, &apple, 5).await;
    add_submission(&db, alice.id, &book, 5).await;
    add_submission(&db, bob.id, &apple, 6).await;
    add_submission(&db, bob.id, &book, 4).await;
    coupons::mint(&db, bob.id, "apple", Utc::now()).await.unwrap();
    add_submission(&db, carol.id, &apple, 3).await;

    let board = stats::leaderboard(&db, 10).await.unwrap();

    assert_eq!(board.len(), 3);
    assert_eq!(board[0].username, "bob");
    assert_eq!(board[0].total_points, 10);
    assert_eq!(board[0].total_coupons, 1);
    assert_eq!(board[1].username, "alice");
    assert_eq!(board[1].words_completed, 2);
    assert_eq!(board[2].username, "carol");
}

#[tokio::test]
async fn leaderboard_excludes_admins() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple").await;

    let boss = create_user(&db, "boss", true).await;
    let alice = create_user(&db, "alice", false).await;
    add_submission(&db, boss.id, &apple, 6).await;
    add_submission(&db, alice.id, &apple, 1).await;

    let board = stats::leaderboard(&db, 10).await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].username, "alice");
}

#[tokio::test]
async fn leaderboard_limit_is_applied_and_capped() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple").await;
    for i in 0..3 {
        let u = create_user(&db, &format!("user{}", i), false).await;
        add_submission(&db, u.id, &apple, 1).await;
    }

    let two = stats::leaderboard(&db, 2).await.unwrap();
    assert_eq!(two.len(), 2);

    // Out-of-range limits are clamped, not an error
    let capped = stats::leaderboard(&db, 10_000).await.unwrap();
    assert_eq!(capped.len(), 3);
    let floor = stats::leaderboard(&db, 0).await.unwrap();
    assert_eq!(floor.len(), 1);
}

#[tokio::test]
async fn user_stats_aggregates_one_user() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple").await;
    let book = create_word(&db, "book").await;
    let alice = create_user(&db, "alice", false).await;

    add_submission(&db, alice.id, &apple, 5).await;
    add_submission(&db, alice.id, &book, 2).await;
    coupons::mint(&db, alice.id, "apple", Utc::now()).await.unwrap();

    let score = stats::user_stats(&db, alice.id).await.unwrap().unwrap();
    assert_eq!(score.total_points, 7);
    assert_eq!(score.total_coupons, 1);
    assert_eq!(score.words_completed, 2);

    assert!(stats::user_stats(&db, 9999).await.unwrap().is_none());
}

#[tokio::test]
async fn coupon_confirmation_happens_exactly_once() {
    let db = setup_test_db().await;
    let alice = create_user(&db, "alice", false).await;
    let bob = create_user(&db, "bob", false).await;

    let minted = coupons::mint(&db, alice.id, "apple", Utc::now())
        .await
        .unwrap();
    assert_eq!(minted.status, coupon::STATUS_PENDING);

    // Someone else's coupon cannot be confirmed
    assert!(!coupons::confirm(&db, bob.id, minted.id).await.unwrap());

    assert!(coupons::confirm(&db, alice.id, minted.id).await.unwrap());

    let stored = coupon::Entity::find_by_id(minted.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, coupon::STATUS_CONFIRMED);
    assert!(stored.confirmed_at.is_some());

    // Re-confirming is a no-op failure, not a second transition
    assert!(!coupons::confirm(&db, alice.id, minted.id).await.unwrap());

    let unchanged = coupon::Entity::find_by_id(minted.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.confirmed_at, stored.confirmed_at);
}

#[tokio::test]
async fn admin_rollups_include_admin_accounts() {
    let db = setup_test_db().await;
    let apple = create_word(&db, "apple").await;
    let boss = create_user(&db, "boss", true).await;
    let alice = create_user(&db, "alice", false).await;
    add_submission(&db, alice.id, &apple, 4).await;
    coupons::mint(&db, alice.id, "apple", Utc::now()).await.unwrap();

    let rows = stats::all_user_stats(&db).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.username == "boss" && r.is_admin));

    let all = stats::all_coupons(&db).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].username, "alice");
    let _ = boss;
}
