//! Error types for the setlist core library.

use thiserror::Error;

/// Top-level error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An `eventDate` could not be parsed as `dd-mm-YYYY`.
    #[error("Invalid event date '{value}': {source}")]
    InvalidEventDate {
        /// The raw value from the API.
        value: String,
        /// Underlying chrono parse error.
        source: chrono::ParseError,
    },

    /// Configuration is malformed or out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;
