//! Fixed-delay retry policy for chunk fetches.
//!
//! Each chunk gets a bounded number of attempts separated by a constant
//! pause. There is no exponential growth and no jitter.
//!
//! # Example
//!
//! ```
//! use linkfetch_core::download::{DownloadError, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let busy = DownloadError::http_status("https://example.com/file.bin", 503);
//!
//! if let RetryDecision::Retry { delay, attempt } = policy.should_retry(&busy, 1) {
//!     assert_eq!(attempt, 2);
//!     assert_eq!(delay, policy.delay());
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Outcome of [`RetryPolicy::should_retry`] for one failed chunk attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then make attempt number `attempt` (1-based).
    Retry {
        /// Sleep before the next attempt.
        delay: Duration,
        /// Number of the upcoming attempt.
        attempt: u32,
    },

    /// Give up on the chunk.
    DoNotRetry {
        /// Why no further attempt is made.
        reason: String,
    },
}

/// Bounded attempts with a fixed delay between them.
///
/// Defaults to three attempts one second apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per chunk, the first one included.
    max_attempts: u32,

    /// Pause between attempts.
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Attempts allowed per chunk.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the pause between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed with `error`.
    #[instrument(skip(self, error), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, error: &DownloadError, attempt: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn transient() -> DownloadError {
        DownloadError::http_status("http://example.com", 503)
    }

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(
            policy.should_retry(&transient(), 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_should_retry_respects_max_attempts() {
        let policy = RetryPolicy::default();

        let decision = policy.should_retry(&transient(), 1);
        assert_eq!(
            decision,
            RetryDecision::Retry {
                delay: Duration::from_secs(1),
                attempt: 2
            }
        );

        let decision = policy.should_retry(&transient(), 2);
        assert!(matches!(decision, RetryDecision::Retry { attempt: 3, .. }));

        let decision = policy.should_retry(&transient(), 3);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("exhausted"));
        }
    }

    #[test]
    fn test_delay_is_fixed_across_attempts() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250));
        let delays: Vec<Duration> = (1..5)
            .filter_map(|attempt| match policy.should_retry(&transient(), attempt) {
                RetryDecision::Retry { delay, .. } => Some(delay),
                RetryDecision::DoNotRetry { .. } => None,
            })
            .collect();
        assert_eq!(delays, vec![Duration::from_millis(250); 4]);
    }

    #[test]
    fn test_should_not_retry_permanent_errors() {
        let policy = RetryPolicy::default();
        let error = DownloadError::range_ignored("http://example.com", "bytes=0-1", 200);
        let decision = policy.should_retry(&error, 1);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("permanent"));
        }
    }
}
