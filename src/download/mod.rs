//! HTTP download engine: probing, parallel byte-range fetching and
//! single-stream fallback.
//!
//! This module turns a direct download URL into a file on disk. Large files
//! whose server honors `Range` requests are split into fixed-size chunks and
//! fetched concurrently; everything else is streamed with one request.
//!
//! # Features
//!
//! - Metadata probe with graceful fallback ([`RangeProbe`])
//! - Bounded pool of chunk fetchers sharing one connection pool
//! - Cooperative pause/resume ([`PauseGate`]) and cancellation
//! - Fixed-delay per-chunk retries ([`RetryPolicy`])
//! - Cumulative-average speed and ETA ([`SpeedEstimator`])
//!
//! # Example
//!
//! ```no_run
//! use linkfetch_core::download::{partition_chunks, Strategy};
//!
//! let total = 100 * 1024 * 1024;
//! assert_eq!(Strategy::select(total, true, 1024 * 1024), Strategy::Chunked);
//! assert_eq!(partition_chunks(total, 4 * 1024 * 1024).len(), 25);
//! ```

mod chunk;
mod client;
mod config;
pub mod constants;
mod error;
pub mod filename;
mod pause;
mod probe;
mod retry;
mod scheduler;
mod speed;

pub use chunk::{ChunkFetcher, ChunkSpec, partition_chunks};
pub use client::HttpClient;
pub use config::{EngineConfig, EngineError};
pub use error::{ChunkError, DownloadError};
pub use pause::PauseGate;
pub use probe::{ProbeResult, RangeProbe, probe_result_from_headers};
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::{DownloadJob, DownloadScheduler, JobOutcome, JobReport, Strategy};
pub use speed::{SpeedEstimator, SpeedSample, format_eta};

// Note: no module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
