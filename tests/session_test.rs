//! Session validity gate and token plumbing.

use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;
use serial_test::serial;

use snaphunt::auth::{create_jwt, decode_jwt};
use snaphunt::db;
use snaphunt::domain::DomainError;
use snaphunt::game::{session, settings};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

#[tokio::test]
async fn any_token_is_fresh_before_the_first_reset() {
    let db = setup_test_db().await;

    let ancient = (Utc::now() - Duration::days(365)).timestamp();
    assert!(session::ensure_fresh(&db, ancient).await.is_ok());
}

#[tokio::test]
async fn tokens_issued_before_a_reset_are_rejected() {
    let db = setup_test_db().await;

    let before = (Utc::now() - Duration::hours(1)).timestamp();
    settings::mark_reset(&db).await.unwrap();

    let err = session::ensure_fresh(&db, before).await.unwrap_err();
    assert!(matches!(err, DomainError::SessionExpired));
}

#[tokio::test]
async fn tokens_issued_after_a_reset_are_accepted() {
    let db = setup_test_db().await;

    settings::mark_reset(&db).await.unwrap();
    let after = (Utc::now() + Duration::seconds(5)).timestamp();

    assert!(session::ensure_fresh(&db, after).await.is_ok());
}

#[tokio::test]
async fn session_expiry_is_distinct_from_generic_auth_failure() {
    let db = setup_test_db().await;
    settings::mark_reset(&db).await.unwrap();

    let before = (Utc::now() - Duration::hours(2)).timestamp();
    let err = session::ensure_fresh(&db, before).await.unwrap_err();
    assert_eq!(err.code(), "SESSION_EXPIRED_RESET");
}

#[test]
#[serial]
fn jwt_roundtrip_preserves_identity() {
    std::env::set_var("JWT_SECRET", "test-secret");

    let token = create_jwt(7, "alice", false).expect("Failed to create token");
    let claims = decode_jwt(&token).expect("Failed to decode token");

    assert_eq!(claims.sub, "7");
    assert_eq!(claims.user_id().unwrap(), 7);
    assert_eq!(claims.username, "alice");
    assert!(!claims.admin);
    assert!(claims.exp > claims.iat);
}

#[test]
#[serial]
fn jwt_carries_the_admin_flag() {
    std::env::set_var("JWT_SECRET", "test-secret");

    let token = create_jwt(1, "boss", true).unwrap();
    let claims = decode_jwt(&token).unwrap();
    assert!(claims.admin);
}

#[test]
#[serial]
fn garbage_tokens_are_rejected() {
    std::env::set_var("JWT_SECRET", "test-secret");

    assert!(decode_jwt("not-a-token").is_err());
}
