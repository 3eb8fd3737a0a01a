use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Rate limit quota read from response headers.
///
/// Held only for the duration of a retry loop; nothing is persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests remaining in the current quota window.
    pub remaining: Option<u64>,
    /// When the quota window resets.
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimit {
    /// Reads `x-ratelimit-remaining` / `x-ratelimit-reset` (epoch seconds)
    /// from a response. Missing or malformed headers yield `None` fields.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Self {
            remaining,
            reset_at,
        }
    }

    /// Whether the window quota is spent.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Delay before retrying a rate-limited request.
///
/// Sleeps until the advertised reset, clamped to `[0, cap]`. Falls back to
/// exponential backoff when no reset time was advertised. The result never
/// exceeds the reset window.
pub fn reset_delay(
    reset_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    attempt: usize,
    base: Duration,
    cap: Duration,
) -> Duration {
    match reset_at {
        Some(reset) => {
            let until_reset = (reset - now).to_std().unwrap_or(Duration::ZERO);
            until_reset.min(cap)
        }
        None => backoff_delay(attempt, base, cap),
    }
}

/// Exponential backoff delay: `base * 2^attempt`, capped.
///
/// The shift is guarded so large attempt counts cannot overflow.
pub fn backoff_delay(attempt: usize, base: Duration, cap: Duration) -> Duration {
    let exp = attempt.min(16) as u32;
    let multiplier = 1u64 << exp;
    let delay_ms = (base.as_millis() as u64).saturating_mul(multiplier);
    Duration::from_millis(delay_ms).min(cap)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::{backoff_delay, reset_delay, RateLimit};

    const BASE: Duration = Duration::from_millis(250);
    const CAP: Duration = Duration::from_secs(60);

    #[test]
    fn parses_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("42"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));

        let rate = RateLimit::from_headers(&headers);
        assert_eq!(rate.remaining, Some(42));
        assert_eq!(
            rate.reset_at,
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
        assert!(!rate.is_exhausted());
    }

    #[test]
    fn missing_headers_yield_defaults() {
        let rate = RateLimit::from_headers(&HeaderMap::new());
        assert_eq!(rate, RateLimit::default());
    }

    #[test]
    fn malformed_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("many"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("soon"));

        let rate = RateLimit::from_headers(&headers);
        assert_eq!(rate.remaining, None);
        assert_eq!(rate.reset_at, None);
    }

    #[test]
    fn reset_delay_never_exceeds_reset_window() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let reset = now + chrono::Duration::seconds(30);

        let delay = reset_delay(Some(reset), now, 0, BASE, CAP);
        assert!(delay <= Duration::from_secs(30));
        assert!(delay >= Duration::from_secs(29));
    }

    #[test]
    fn reset_delay_in_the_past_is_zero() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let reset = now - chrono::Duration::seconds(10);

        assert_eq!(reset_delay(Some(reset), now, 0, BASE, CAP), Duration::ZERO);
    }

    #[test]
    fn reset_delay_is_capped() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let reset = now + chrono::Duration::hours(2);

        assert_eq!(reset_delay(Some(reset), now, 0, BASE, CAP), CAP);
    }

    #[test]
    fn reset_delay_without_header_falls_back_to_backoff() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        assert_eq!(reset_delay(None, now, 2, BASE, CAP), BASE * 4);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(0, BASE, CAP), BASE);
        assert_eq!(backoff_delay(1, BASE, CAP), BASE * 2);
        assert_eq!(backoff_delay(3, BASE, CAP), BASE * 8);
    }

    #[test]
    fn backoff_is_capped_and_overflow_safe() {
        assert_eq!(backoff_delay(10, BASE, CAP), CAP);
        assert_eq!(backoff_delay(usize::MAX, BASE, CAP), CAP);
    }
}
