//! Domain layer - business-level types shared across the API and game logic

pub mod errors;

pub use errors::DomainError;
