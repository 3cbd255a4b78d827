use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use crate::classifier::Classifier;

#[derive(Clone)]
pub struct AppState {
    pub conn: DatabaseConnection,
    pub classifier: Classifier,
}

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Create users table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_admin BOOLEAN NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_active TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create words table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            required_completions INTEGER DEFAULT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create game_state table: the single row (id = 1) points at the
    // active word, so there is no is_active scan anywhere.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS game_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            current_word_id INTEGER,
            activated_at TEXT,
            FOREIGN KEY (current_word_id) REFERENCES words(id)
        )
        "#
        .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        INSERT OR IGNORE INTO game_state (id, current_word_id, activated_at)
        VALUES (1, NULL, NULL)
        "#
        .to_owned(),
    ))
    .await?;

    // Create submissions table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            word_id INTEGER NOT NULL,
            word TEXT NOT NULL,
            points INTEGER NOT NULL,
            confidence INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (word_id) REFERENCES words(id),
            UNIQUE(user_id, word_id)
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create coupons table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS coupons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            word TEXT NOT NULL,
            coupon_code TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'pending',
            prize_description TEXT NOT NULL DEFAULT 'Special booth prize',
            created_at TEXT NOT NULL,
            confirmed_at TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create settings table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Indexes for the hot paths (duplicate check, counts, coupon listing)
    for idx in [
        "CREATE INDEX IF NOT EXISTS idx_submissions_user_id ON submissions(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_submissions_word_id ON submissions(word_id)",
        "CREATE INDEX IF NOT EXISTS idx_coupons_user_id ON coupons(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_coupons_status ON coupons(status)",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            idx.to_owned(),
        ))
        .await?;
    }

    Ok(())
}
