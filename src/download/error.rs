//! Error types for the download module.
//!
//! This module defines structured errors for transfers and chunk fetches,
//! providing context-rich error messages for the log stream.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while transferring bytes.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A ranged request was answered with the whole resource.
    #[error("server ignored range {range} for {url} (HTTP {status})")]
    RangeIgnored {
        /// The URL that ignored the range.
        url: String,
        /// The requested `Range` header value.
        range: String,
        /// The status the server answered with.
        status: u16,
    },

    /// The response body ended before the expected number of bytes arrived.
    #[error("incomplete body from {url}: expected {expected} bytes, got {actual}")]
    Incomplete {
        /// The URL whose body was short.
        url: String,
        /// Expected byte count.
        expected: u64,
        /// Received byte count.
        actual: u64,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts and
    /// request-building failures (an unparsable URL).
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        if source.is_builder() {
            return Self::InvalidUrl { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a range-ignored error.
    pub fn range_ignored(url: impl Into<String>, range: impl Into<String>, status: u16) -> Self {
        Self::RangeIgnored {
            url: url.into(),
            range: range.into(),
            status,
        }
    }

    /// Creates a short-body error.
    pub fn incomplete(url: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::Incomplete {
            url: url.into(),
            expected,
            actual,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true when another attempt at the same request could succeed.
    ///
    /// Every transport and HTTP failure is retryable. A server that ignores
    /// ranges, a local file error or a malformed URL will fail the same way
    /// again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::RangeIgnored { .. } | Self::Io { .. } | Self::InvalidUrl { .. }
        )
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// URL or path that the source error does not carry.

/// A chunk that could not be delivered.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Every attempt failed; the chunk's byte range stays zero-filled.
    #[error("chunk {index} failed after {attempts} attempt(s): {source}")]
    Failed {
        /// Sequence index of the chunk.
        index: usize,
        /// Attempts made before giving up.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        source: DownloadError,
    },

    /// The session was cancelled before the chunk finished.
    #[error("chunk {index} cancelled")]
    Cancelled {
        /// Sequence index of the chunk.
        index: usize,
    },
}

impl ChunkError {
    /// Returns the sequence index of the affected chunk.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. } | Self::Cancelled { index } => *index,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::Timeout {
            url: "https://example.com/file.bin".to_string(),
        };
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/file.bin"));
    }

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://example.com/file.bin", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(
            msg.contains("https://example.com/file.bin"),
            "Expected URL in: {msg}"
        );
    }

    #[test]
    fn test_download_error_incomplete_display() {
        let error = DownloadError::incomplete("https://example.com/a", 100, 40);
        let msg = error.to_string();
        assert!(msg.contains("100"), "Expected expected size in: {msg}");
        assert!(msg.contains("40"), "Expected actual size in: {msg}");
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/test.bin"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/test.bin"), "Expected path in: {msg}");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(DownloadError::Timeout { url: "u".into() }.is_retryable());
        assert!(DownloadError::http_status("u", 500).is_retryable());
        assert!(DownloadError::http_status("u", 404).is_retryable());
        assert!(DownloadError::incomplete("u", 10, 5).is_retryable());
        assert!(!DownloadError::range_ignored("u", "bytes=0-9", 200).is_retryable());
        assert!(!DownloadError::InvalidUrl { url: "u".into() }.is_retryable());
        let io_error = std::io::Error::other("disk");
        assert!(!DownloadError::io("/tmp/x", io_error).is_retryable());
    }

    #[test]
    fn test_chunk_error_display_and_index() {
        let error = ChunkError::Failed {
            index: 7,
            attempts: 3,
            source: DownloadError::http_status("https://example.com/f", 502),
        };
        assert_eq!(error.index(), 7);
        let msg = error.to_string();
        assert!(msg.contains("chunk 7"), "Expected chunk index in: {msg}");
        assert!(msg.contains("3 attempt"), "Expected attempts in: {msg}");

        let cancelled = ChunkError::Cancelled { index: 2 };
        assert_eq!(cancelled.index(), 2);
        assert!(cancelled.to_string().contains("cancelled"));
    }
}
