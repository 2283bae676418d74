//! Error types for dirsearch

use thiserror::Error;

/// Result type alias using dirsearch's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Dirsearch error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Realm '{0}' not found. Run `dirsearch import <fixture>` to load a directory.")]
    RealmNotFound(String),

    // Query errors (E100-E199)
    #[error("Query parameter ':{0}' has no bound value")]
    UnboundParameter(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::RealmNotFound(_) => "E001",
            Self::UnboundParameter(_) => "E100",
            Self::DatabaseError(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Parse(_) => "E801",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::RealmNotFound(_) => Some("dirsearch import <fixture.json>".to_string()),
            Self::ConfigError(_) => Some("dirsearch config list".to_string()),
            Self::InvalidInput(_) => {
                Some("_first/_max must be integers, _orderDirect must be ASC or DESC".to_string())
            }
            _ => None,
        }
    }
}
