//! Metadata probe: total size and byte-range support.

use std::time::Duration;

use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap};
use tracing::{debug, instrument};

use super::HttpClient;

/// What the probe learned about a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeResult {
    /// Size from `Content-Length`, 0 when absent or unknown.
    pub total_size: u64,
    /// True when the server advertises `Accept-Ranges: bytes`.
    pub supports_ranges: bool,
}

/// Issues metadata-only requests ahead of a transfer.
#[derive(Debug, Clone)]
pub struct RangeProbe {
    client: HttpClient,
    timeout: Duration,
}

impl RangeProbe {
    /// Creates a probe that bounds each request by `timeout`.
    #[must_use]
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Probes `url` with a HEAD request.
    ///
    /// Never fails: any transport or status error yields the default
    /// result (unknown size, no range support), which callers treat as
    /// "fall back to single-stream".
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe(&self, url: &str) -> ProbeResult {
        match self.client.head(url, self.timeout).await {
            Ok(response) => {
                let result = probe_result_from_headers(response.headers());
                debug!(
                    total_size = result.total_size,
                    supports_ranges = result.supports_ranges,
                    "probe complete"
                );
                result
            }
            Err(error) => {
                debug!(error = %error, "probe failed; assuming unknown size without ranges");
                ProbeResult::default()
            }
        }
    }
}

/// Reads size and range capability from response headers.
///
/// `Content-Length` is read from the header itself; a HEAD response has no
/// body, so the body size hint would always be zero.
#[must_use]
pub fn probe_result_from_headers(headers: &HeaderMap) -> ProbeResult {
    let total_size = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let supports_ranges = headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("bytes"));

    ProbeResult {
        total_size,
        supports_ranges,
    }
}
