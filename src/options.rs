/// Configures HTTP timeout, retry, pagination, and cache behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
    /// Upper bound on any single retry sleep in milliseconds.
    pub retry_cap_ms: u64,
    /// Items requested per page on list endpoints.
    pub per_page: u32,
    /// Response cache lifetime in milliseconds. Zero disables caching.
    pub cache_ttl_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            retry_backoff_ms: 250,
            retry_cap_ms: 60_000,
            per_page: 100,
            cache_ttl_ms: 300_000,
        }
    }
}
