//! Transport retry policy.

use std::collections::BTreeSet;
use std::time::Duration;

/// HTTP status the API answers with when a backend is briefly unavailable.
pub const UNAVAILABLE: u16 = 503;

/// Retry policy applied to every unary call of an [`super::ApiClient`].
///
/// A call is attempted up to `1 + max_retry_count` times. Only statuses in
/// `retriable_codes` are retried; a connection failure counts as
/// [`UNAVAILABLE`]. Attempt `n` waits `retry_backoff * n` before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retry_count: u32,
    /// Timeout of a single attempt.
    pub per_call_timeout: Duration,
    /// HTTP statuses that are retried.
    pub retriable_codes: BTreeSet<u16>,
    /// Base delay between attempts.
    pub retry_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            per_call_timeout: Duration::from_secs(10),
            retriable_codes: BTreeSet::from([UNAVAILABLE]),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sets the number of additional attempts.
    #[must_use]
    pub const fn with_max_retry_count(mut self, count: u32) -> Self {
        self.max_retry_count = count;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }

    /// Sets the base delay between attempts.
    #[must_use]
    pub const fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Returns the total number of attempts a call may make.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retry_count.saturating_add(1)
    }

    /// Returns true if a response with this status is retried.
    #[must_use]
    pub fn is_retriable(&self, status: u16) -> bool {
        self.retriable_codes.contains(&status)
    }

    /// Delay before the given retry attempt (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert!(policy.is_retriable(503));
        assert!(!policy.is_retriable(400));
        assert!(!policy.is_retriable(500));
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default().with_retry_backoff(Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(250));
        assert_eq!(policy.backoff(3), Duration::from_millis(750));
    }
}
