//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP mapping lives in the api layer.

use std::fmt;

#[derive(Debug)]
pub enum DomainError {
    /// Malformed or out-of-range input
    Validation(String),
    /// Missing or invalid credentials
    Auth(String),
    /// Token predates the last cycle reset; the client must force a logout
    SessionExpired,
    /// Role mismatch (non-admin on admin route, admin on gameplay route)
    Forbidden(String),
    /// Submission attempted outside the configured booth hours
    BoothClosed,
    /// Resource not found
    NotFound(String),
    /// Duplicate resource (e.g. username already taken)
    Conflict(String),
    /// Classifier service unavailable or returned garbage
    Upstream(String),
    /// The word table is empty; rotation cannot proceed
    NoWordsAvailable,
    /// Database/persistence error
    Database(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::Validation(msg) => write!(f, "Validation error: {}", msg),
            DomainError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            DomainError::SessionExpired => {
                write!(f, "Session was invalidated by a game reset")
            }
            DomainError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            DomainError::BoothClosed => write!(f, "The booth is currently closed"),
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Upstream(msg) => write!(f, "Upstream service error: {}", msg),
            DomainError::NoWordsAvailable => write!(f, "No words available for rotation"),
            DomainError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used everywhere the store is touched)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl DomainError {
    /// Machine-readable kind, returned alongside the human message so
    /// clients can branch without parsing text.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "VALIDATION",
            DomainError::Auth(_) => "AUTH",
            DomainError::SessionExpired => "SESSION_EXPIRED_RESET",
            DomainError::Forbidden(_) => "FORBIDDEN",
            DomainError::BoothClosed => "BOOTH_CLOSED",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::Upstream(_) => "UPSTREAM",
            DomainError::NoWordsAvailable => "NO_WORDS",
            DomainError::Database(_) => "INTERNAL",
        }
    }
}
