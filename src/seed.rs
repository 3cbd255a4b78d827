use sea_orm::*;
use std::env;

use crate::auth::hash_password;
use crate::domain::DomainError;
use crate::models::{user, word};

const STARTER_WORDS: &[&str] = &[
    "apple", "book", "chair", "dog", "elephant", "flower", "guitar", "house", "ice", "jacket",
    "key", "lamp", "mountain", "notebook", "ocean", "pencil", "queen", "rainbow", "sun", "tree",
    "umbrella", "violin", "water", "xray", "yacht", "zebra", "backpack", "camera", "diamond",
    "eagle", "fire", "glass", "helmet", "island", "jungle", "kite", "lighthouse", "mirror",
    "nest", "owl", "piano", "quilt", "rocket", "star", "telescope", "unicorn", "valley", "whale",
    "xenon", "yarn", "zoo", "airplane", "bridge", "castle", "door", "engine", "forest", "garden",
    "horizon", "igloo", "jewel", "kitchen", "library", "maze",
];

/// Seed the starter word list and an admin account. Idempotent; safe to
/// run against a populated database.
pub async fn seed_game_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    let now = chrono::Utc::now().to_rfc3339();

    for text in STARTER_WORDS {
        let model = word::ActiveModel {
            word: Set(text.to_string()),
            created_at: Set(now.clone()),
            required_completions: Set(None),
            ..Default::default()
        };
        word::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(word::Column::Word)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(db)
            .await?;
    }

    let admin_password =
        env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "change-me-please".to_string());
    let admin = user::ActiveModel {
        username: Set("admin".to_owned()),
        password_hash: Set(hash_password(&admin_password)?),
        is_admin: Set(true),
        created_at: Set(now.clone()),
        last_active: Set(now),
        ..Default::default()
    };
    user::Entity::insert(admin)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(db)
        .await?;

    tracing::info!(words = STARTER_WORDS.len(), "game data seeded");
    Ok(())
}
