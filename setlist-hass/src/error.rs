//! Errors raised while refreshing and publishing.

use setlist_client::ClientError;
use thiserror::Error;

/// Failure to deliver a state to the host.
#[derive(Debug, Error)]
pub enum SinkError {
    /// HTTP request to the host failed.
    #[error("Home Assistant request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("Home Assistant rejected state for {entity_id}: HTTP {status}: {body}")]
    Rejected {
        /// Entity that was being written.
        entity_id: String,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// Sink could not be built from its configuration.
    #[error("Home Assistant sink configuration error: {0}")]
    Config(String),
}

/// A user refresh that did not complete.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// setlist.fm could not be read.
    #[error("Failed to fetch data for '{user}': {source}")]
    Fetch {
        /// User display name.
        user: String,
        /// Underlying client error.
        source: ClientError,
    },

    /// States could not be published.
    #[error("Failed to publish states for '{user}': {source}")]
    Publish {
        /// User display name.
        user: String,
        /// Underlying sink error.
        source: SinkError,
    },
}
