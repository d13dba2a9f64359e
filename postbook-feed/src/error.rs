//! Error types for postbook-feed.

use thiserror::Error;

/// All errors that can arise while fetching from the feed.
///
/// None of these are fatal to the process: the sync engine logs them and
/// retries on the next tick.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error calling {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The API answered with a non-success status.
    #[error("{url} answered HTTP {code}: {body}")]
    Status { url: String, code: u16, body: String },

    /// The token endpoint rejected the credentials or the token expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FeedError {
    /// Whether retrying the same request later can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Transport { .. } | FeedError::Auth(_) => true,
            FeedError::Status { code, .. } => matches!(*code, 401 | 408 | 429 | 500..=599),
            FeedError::Decode { .. } => false,
        }
    }
}
