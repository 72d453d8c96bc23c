//! setlist.fm client error types.

use std::time::Duration;

use thiserror::Error;

/// Longest response-body excerpt kept in errors and published states.
pub const BODY_EXCERPT_LEN: usize = 150;

/// Errors that can occur while talking to setlist.fm.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API key was rejected (HTTP 401).
    #[error("Invalid API key")]
    Unauthorized {
        /// Response body, truncated to [`BODY_EXCERPT_LEN`] characters.
        body: String,
    },

    /// The user id does not exist (HTTP 404).
    #[error("User {userid} not found")]
    UserNotFound {
        /// The requested user id.
        userid: String,
        /// Response body, truncated to [`BODY_EXCERPT_LEN`] characters.
        body: String,
    },

    /// The API is throttling us (HTTP 429).
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Response body, truncated to [`BODY_EXCERPT_LEN`] characters.
        body: String,
    },

    /// Any other non-success status.
    #[error("{status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated to [`BODY_EXCERPT_LEN`] characters.
        body: String,
    },

    /// Request timed out.
    #[error("Request to setlist.fm timed out after {0:?}")]
    Timeout(Duration),

    /// Could not connect or the connection broke.
    #[error("Error connecting to setlist.fm: {0}")]
    Connection(String),

    /// Response was not the JSON we expected.
    #[error("Failed to decode setlist.fm response: {0}")]
    Decode(String),

    /// All retry attempts exhausted.
    #[error("Giving up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// How many requests were made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: Box<ClientError>,
    },

    /// Client could not be built from its configuration.
    #[error("setlist.fm client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::RateLimited { .. } | ClientError::Timeout(_) | ClientError::Connection(_)
        )
    }

    /// HTTP status associated with this error, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::UserNotFound { .. } => Some(404),
            ClientError::RateLimited { .. } => Some(429),
            ClientError::Status { status, .. } => Some(*status),
            ClientError::RetriesExhausted { last_error, .. } => last_error.status(),
            _ => None,
        }
    }

    /// Response body excerpt of an HTTP-status error, when there is one.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::Unauthorized { body }
            | ClientError::UserNotFound { body, .. }
            | ClientError::RateLimited { body }
            | ClientError::Status { body, .. } => Some(body),
            ClientError::RetriesExhausted { last_error, .. } => last_error.body(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

/// Cut a response body to at most [`BODY_EXCERPT_LEN`] characters.
#[must_use]
pub fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ClientError>;
