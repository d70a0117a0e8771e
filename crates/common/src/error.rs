//! Error types

use thiserror::Error;

/// Main error type for Carbon Karma
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete input, rejected at the boundary
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate join, modification of a completed item, window violations
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Reserved for point redemption, which lives outside the progression engine
    #[error("Insufficient state: {0}")]
    InsufficientState(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
