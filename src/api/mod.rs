pub mod admin;
pub mod auth;
pub mod game;
pub mod health;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use crate::db::AppState;
use crate::domain::DomainError;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::get_me))
        .route("/auth/change-password", post(auth::change_password))
        // Gameplay
        .route("/game/current-word", get(game::current_word))
        .route("/game/submission-status", get(game::submission_status))
        .route("/game/submit", post(game::submit))
        .route("/game/confirm-coupon", post(game::confirm_coupon))
        .route("/game/user-coupons", get(game::user_coupons))
        .route("/game/user-stats", get(game::user_stats))
        .route("/game/leaderboard", get(game::leaderboard))
        .route("/game/booth-status", get(game::booth_status))
        // Admin
        .route(
            "/admin/words",
            get(admin::list_words).post(admin::create_word),
        )
        .route(
            "/admin/words/:id",
            delete(admin::delete_word).put(admin::update_word),
        )
        .route("/admin/words/activate", post(admin::activate_word))
        .route("/admin/rotate", post(admin::rotate_word))
        .route("/admin/reset-cycle", post(admin::reset_cycle))
        .route(
            "/admin/settings",
            get(admin::get_settings).post(admin::update_settings),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", delete(admin::delete_user))
        .route(
            "/admin/users/:id/reset-password",
            post(admin::reset_password),
        )
        .route("/admin/stats", get(admin::admin_stats))
        .route("/admin/wipe", post(admin::wipe_data))
        .with_state(state)
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = match &self {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Auth(_) | DomainError::SessionExpired => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) | DomainError::BoothClosed => StatusCode::FORBIDDEN,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DomainError::NoWordsAvailable | DomainError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        (status, Json(body)).into_response()
    }
}
