//! Error types for habitcal-core

use thiserror::Error;

/// Main error type for the habitcal-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed record fields at creation or update
    #[error("invalid record: {0}")]
    Validation(String),

    /// Operation referenced a record id that does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Import text could not be parsed at all
    #[error("import error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for habitcal-core
pub type Result<T> = std::result::Result<T, Error>;
