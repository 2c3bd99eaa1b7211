//! Engine configuration and validation.

use std::time::Duration;

use super::constants::{
    BROWSER_USER_AGENT, CHUNK_READ_INCREMENT, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNKED_THRESHOLD,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, MAX_ATTEMPTS,
    MAX_CONCURRENCY, PROBE_TIMEOUT, REQUEST_TIMEOUT, SAMPLE_INTERVAL, STREAM_READ_INCREMENT,
};
use super::retry::RetryPolicy;

/// Error type for engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between 1 and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Chunk size of zero.
    #[error("invalid chunk size {value}: must be at least 1 byte")]
    InvalidChunkSize {
        /// The invalid value that was provided.
        value: u64,
    },

    /// Attempts outside the accepted range.
    #[error("invalid attempt count {value}: must be between 1 and {MAX_ATTEMPTS}")]
    InvalidAttempts {
        /// The invalid value that was provided.
        value: u32,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Tunables for probing, chunking, retrying and reporting.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Byte-range window per chunk.
    pub chunk_size: u64,
    /// Files must be strictly larger than this to be chunked.
    pub chunked_threshold: u64,
    /// Chunk fetchers running at once.
    pub concurrency: usize,
    /// Attempts per chunk, including the first.
    pub max_attempts: u32,
    /// Fixed pause between chunk attempts.
    pub retry_delay: Duration,
    /// Timeout for the metadata probe.
    pub probe_timeout: Duration,
    /// Connect and read timeout for transfer requests.
    pub request_timeout: Duration,
    /// Pause checkpoint spacing inside a chunk body.
    pub chunk_read_increment: usize,
    /// Write size for the single-stream strategy.
    pub stream_read_increment: usize,
    /// Minimum spacing between speed samples.
    pub sample_interval: Duration,
    /// Turn a permanently failed chunk into a failed job.
    pub fail_on_chunk_error: bool,
    /// User-Agent header for every request.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunked_threshold: DEFAULT_CHUNKED_THRESHOLD,
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            probe_timeout: PROBE_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            chunk_read_increment: CHUNK_READ_INCREMENT,
            stream_read_increment: STREAM_READ_INCREMENT,
            sample_interval: SAMPLE_INTERVAL,
            fail_on_chunk_error: false,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`EngineError`] found.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(EngineError::InvalidConcurrency {
                value: self.concurrency,
            });
        }
        if self.chunk_size == 0 {
            return Err(EngineError::InvalidChunkSize {
                value: self.chunk_size,
            });
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.max_attempts) {
            return Err(EngineError::InvalidAttempts {
                value: self.max_attempts,
            });
        }
        Ok(())
    }

    /// Retry policy derived from the attempt settings.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chunk_size, 4 * 1024 * 1024);
        assert_eq!(config.chunked_threshold, 1024 * 1024);
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert!(!config.fail_on_chunk_error);
    }

    #[test]
    fn test_invalid_concurrency_rejected() {
        for value in [0, MAX_CONCURRENCY + 1] {
            let config = EngineConfig {
                concurrency: value,
                ..EngineConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(EngineError::InvalidConcurrency { value: v }) if v == value
            ));
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = EngineConfig {
            chunk_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidChunkSize { value: 0 })
        ));
    }

    #[test]
    fn test_invalid_attempts_rejected() {
        let config = EngineConfig {
            max_attempts: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidAttempts { value: 0 })
        ));
    }

    #[test]
    fn test_retry_policy_follows_config() {
        let config = EngineConfig {
            max_attempts: 5,
            retry_delay: Duration::from_millis(10),
            ..EngineConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_engine_error_display() {
        let msg = EngineError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("64"));
    }
}
