//! Error types for the fetch pipeline.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching and aggregating clan stats.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP-level failure (status >= 400). Carries up to 200 characters
    /// of the raw response body.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// Application-level rejection inside a well-formed API envelope.
    #[error("Bungie API error {status}: {message}")]
    Upstream { status: String, message: String },

    /// Connection-level failure or request timeout.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Malformed response payload.
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally valid JSON that is missing a required field.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// An activity hash mapped to two different raid names in the
    /// identifier table.
    #[error("activity hash {hash} mapped to both {first:?} and {second:?}")]
    DuplicateActivityHash {
        hash: u32,
        first: String,
        second: String,
    },
}

impl Error {
    /// Whether a retry may succeed. Transport faults, upstream rejections
    /// and connection/timeout errors are transient; malformed payloads and
    /// table validation failures are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::Upstream { .. } | Error::Request(_)
        )
    }
}
