use std::time::Duration;

use crate::error::TransportError;

/// Total attempts, including the first one.
pub const MAX_ATTEMPTS: u32 = 3;
/// Fixed delay between attempts after a network failure or non-429 error status.
pub const FLAT_BACKOFF_MS: u64 = 1000;
/// Delay used when a 429 response carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// Attempt budget and backoff schedule for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub flat_backoff: Duration,
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            flat_backoff: Duration::from_millis(FLAT_BACKOFF_MS),
            default_retry_after: Duration::from_millis(DEFAULT_RETRY_AFTER_MS),
        }
    }
}

/// What the transport should do with one observed HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Success,
    /// Surface immediately without spending more attempts.
    Fail,
    /// Wait, then try again if the attempt budget allows it.
    RetryAfter(Duration),
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_flat_backoff(mut self, backoff: Duration) -> Self {
        self.flat_backoff = backoff;
        self
    }

    pub fn with_default_retry_after(mut self, delay: Duration) -> Self {
        self.default_retry_after = delay;
        self
    }

    /// Attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Classify a response status. `retry_after` is the raw header value, if any.
    pub fn classify_status(&self, status: u16, retry_after: Option<&str>) -> RetryDecision {
        match status {
            200..=299 => RetryDecision::Success,
            401 => RetryDecision::Fail,
            429 => RetryDecision::RetryAfter(
                retry_after
                    .and_then(parse_retry_after)
                    .unwrap_or(self.default_retry_after),
            ),
            _ => RetryDecision::RetryAfter(self.flat_backoff),
        }
    }

    /// Delay after an exchange that never produced a response.
    pub fn network_backoff(&self) -> Duration {
        self.flat_backoff
    }
}

/// Parse a `Retry-After` value expressed in (possibly fractional) seconds.
///
/// HTTP-date values and negative or non-finite numbers yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds = value.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds))
}

/// Reported to the caller before each backoff sleep.
#[derive(Debug)]
pub struct RetryNotice<'a> {
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: &'a TransportError,
}
