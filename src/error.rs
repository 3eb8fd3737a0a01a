use chrono::{DateTime, Utc};

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum GitPulseError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Authentication or permission failure. Never retried.
    #[error("authentication error {status}: {body}")]
    Auth { status: u16, body: String },
    /// Rate limit quota stayed exhausted through the retry ceiling.
    #[error("rate limited after {attempts} attempts")]
    RateLimited {
        /// Total requests issued before giving up.
        attempts: usize,
        /// Quota reset time advertised by the last response, if any.
        reset_at: Option<DateTime<Utc>>,
    },
    /// Transient upstream errors persisted through the retry ceiling.
    #[error("gave up after {attempts} attempts, last status {status}: {body}")]
    Exhausted {
        attempts: usize,
        status: u16,
        body: String,
    },
    /// Non-success HTTP status that is not worth retrying.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response decoding or payload-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
}
