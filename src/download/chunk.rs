//! Byte-range partitioning and the per-chunk fetcher.
//!
//! A [`ChunkFetcher`] retrieves one [`ChunkSpec`] with bounded retries and
//! writes it at its own offset in a destination file that the scheduler has
//! already sized to the full length. Offsets of different chunks never
//! overlap, so each write opens its own handle and no locking is needed.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::client::HttpClient;
use super::error::{ChunkError, DownloadError};
use super::pause::PauseGate;
use super::retry::{RetryDecision, RetryPolicy};
use crate::events::{EventSink, LogEntry, LogLevel};

/// One contiguous byte window of the target file. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Zero-based sequence index.
    pub index: usize,
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ChunkSpec {
    /// Number of bytes covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a chunk covers at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Range` header value for this chunk.
    #[must_use]
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Splits `[0, total)` into contiguous windows of `chunk_size` bytes.
///
/// The last chunk may be shorter. Returns an empty vector for `total == 0`.
/// A `chunk_size` of zero is treated as one byte.
#[must_use]
pub fn partition_chunks(total: u64, chunk_size: u64) -> Vec<ChunkSpec> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0u64;
    while start < total {
        let end = start.saturating_add(chunk_size).min(total) - 1;
        chunks.push(ChunkSpec {
            index: chunks.len(),
            start,
            end,
        });
        start = end + 1;
    }
    chunks
}

/// What one attempt produced.
enum AttemptOutcome {
    Written(u64),
    Cancelled,
}

/// Fetches byte ranges of one URL into one destination file.
///
/// Shared by all chunk tasks of a job through an `Arc`.
#[derive(Debug)]
pub struct ChunkFetcher {
    client: HttpClient,
    url: String,
    path: PathBuf,
    policy: RetryPolicy,
    gate: PauseGate,
    cancel: CancellationToken,
    read_increment: usize,
    events: EventSink,
}

impl ChunkFetcher {
    /// Creates a fetcher for `url` writing into `path`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: HttpClient,
        url: impl Into<String>,
        path: impl Into<PathBuf>,
        policy: RetryPolicy,
        gate: PauseGate,
        cancel: CancellationToken,
        read_increment: usize,
        events: EventSink,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            path: path.into(),
            policy,
            gate,
            cancel,
            read_increment: read_increment.max(1),
            events,
        }
    }

    /// Retrieves `spec` and writes it at `spec.start`.
    ///
    /// Waits on the pause gate before every request and between body
    /// increments. Failed attempts are retried after the policy's fixed delay.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Failed`] once the retry policy gives up, or
    /// [`ChunkError::Cancelled`] when the job is cancelled first.
    #[instrument(skip(self), fields(chunk = spec.index, range = %spec.range_header()))]
    pub async fn fetch(&self, spec: ChunkSpec) -> Result<u64, ChunkError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if !self.gate.wait_resumed(&self.cancel).await {
                return Err(ChunkError::Cancelled { index: spec.index });
            }

            let error = match self.attempt(&spec).await {
                Ok(AttemptOutcome::Written(bytes)) => {
                    debug!(attempt, bytes, "chunk written");
                    return Ok(bytes);
                }
                Ok(AttemptOutcome::Cancelled) => {
                    return Err(ChunkError::Cancelled { index: spec.index });
                }
                Err(error) => error,
            };

            match self.policy.should_retry(&error, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying chunk"
                    );
                    self.events.log(
                        LogEntry::new(LogLevel::Warning, "Retrying chunk")
                            .detail("Chunk", spec.index + 1)
                            .detail(
                                "Attempt",
                                format!("{next_attempt}/{}", self.policy.max_attempts()),
                            )
                            .detail("Error", &error),
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => {
                            return Err(ChunkError::Cancelled { index: spec.index });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, %reason, "giving up on chunk");
                    return Err(ChunkError::Failed {
                        index: spec.index,
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }

    async fn attempt(&self, spec: &ChunkSpec) -> Result<AttemptOutcome, DownloadError> {
        let range = spec.range_header();
        let response = self.client.get(&self.url, Some(&range)).await?;
        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            return Err(DownloadError::range_ignored(
                &self.url,
                range,
                status.as_u16(),
            ));
        }

        let expected = spec.len();
        let limit = usize::try_from(expected).unwrap_or(usize::MAX);
        let mut buffer: Vec<u8> =
            Vec::with_capacity(initial_buffer_capacity(expected, self.read_increment));
        let mut since_checkpoint = 0usize;
        let mut stream = response.bytes_stream();

        while let Some(item) = stream.next().await {
            let bytes = item.map_err(|e| DownloadError::network(&self.url, e))?;
            let room = limit.saturating_sub(buffer.len());
            let take = bytes.len().min(room);
            buffer.extend_from_slice(&bytes[..take]);
            since_checkpoint += bytes.len();

            if buffer.len() >= limit {
                break;
            }
            if since_checkpoint >= self.read_increment {
                since_checkpoint = 0;
                if !self.gate.wait_resumed(&self.cancel).await {
                    return Ok(AttemptOutcome::Cancelled);
                }
            }
        }

        let received = buffer.len() as u64;
        if received < expected {
            return Err(DownloadError::incomplete(&self.url, expected, received));
        }

        write_at(&self.path, spec.start, &buffer).await?;
        Ok(AttemptOutcome::Written(received))
    }
}

/// Up-front buffer reservation for a chunk body; the rest grows on demand.
fn initial_buffer_capacity(chunk_len: u64, read_increment: usize) -> usize {
    usize::try_from(chunk_len)
        .unwrap_or(usize::MAX)
        .min(read_increment.max(1))
}

/// Writes `data` at `offset` in an existing file.
async fn write_at(path: &Path, offset: u64, data: &[u8]) -> Result<(), DownloadError> {
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.write_all(data)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.flush().await.map_err(|e| DownloadError::io(path, e))
}
