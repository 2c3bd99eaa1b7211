//! Constants for the download module (sizes, timeouts, pacing).

use std::time::Duration;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Size of each byte-range window in the chunked strategy (4 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * MIB;

/// Files must be strictly larger than this to use the chunked strategy (1 MiB).
pub const DEFAULT_CHUNKED_THRESHOLD: u64 = MIB;

/// Default number of chunk fetchers running at once.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Upper bound accepted for the fetcher pool.
pub const MAX_CONCURRENCY: usize = 64;

/// Minimum number of pooled idle connections per host.
pub const MIN_POOLED_CONNECTIONS: usize = 16;

/// Attempts per chunk, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Upper bound accepted for per-chunk attempts.
pub const MAX_ATTEMPTS: u32 = 10;

/// Fixed pause between chunk attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Timeout for the metadata probe request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect and read timeout for transfer requests.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for fetching a link page during resolution.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause checkpoint spacing inside a chunk body (256 KiB).
pub const CHUNK_READ_INCREMENT: usize = 256 * 1024;

/// Write size for the single-stream strategy (1 MiB).
pub const STREAM_READ_INCREMENT: usize = 1024 * 1024;

/// Minimum spacing between externally visible speed samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Browser User-Agent sent with every request; some hosts refuse tool agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
