//! Per-job download scheduling: strategy choice, chunk dispatch, progress
//! aggregation and completion.
//!
//! # Aggregation invariant
//!
//! Exactly one task owns a job's byte counter and [`SpeedEstimator`]: the
//! task running [`DownloadScheduler::run`]. Chunk fetchers only return their
//! byte counts; the scheduler adds them as results arrive. Progress readings
//! are therefore monotonically non-decreasing without atomics. Any design
//! with more than one writer must introduce explicit synchronization.
//!
//! # Example
//!
//! ```no_run
//! use linkfetch_core::download::{
//!     DownloadJob, DownloadScheduler, EngineConfig, HttpClient, JobOutcome, PauseGate,
//! };
//! use linkfetch_core::events::EventSink;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let client = HttpClient::new(&config)?;
//! let (events, _rx) = EventSink::channel();
//! let scheduler = DownloadScheduler::new(
//!     client,
//!     config,
//!     PauseGate::new(),
//!     CancellationToken::new(),
//!     events,
//! );
//!
//! let job = DownloadJob::new(
//!     "https://example.com/page",
//!     "https://example.com/file.iso",
//!     "downloads/file.iso",
//! );
//! if let JobOutcome::Completed(report) = scheduler.run(job).await {
//!     println!("{} bytes in {:?}", report.downloaded, report.elapsed);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::chunk::{ChunkFetcher, ChunkSpec, partition_chunks};
use super::client::HttpClient;
use super::config::EngineConfig;
use super::constants::MIB;
use super::error::{ChunkError, DownloadError};
use super::pause::PauseGate;
use super::probe::{ProbeResult, RangeProbe};
use super::speed::{SpeedEstimator, SpeedSample};
use crate::events::{DownloadEvent, EventSink, LogEntry, LogLevel};

/// How a job's bytes are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Concurrent byte-range requests into a pre-sized file.
    Chunked,
    /// One plain GET streamed from offset 0.
    SingleStream,
}

impl Strategy {
    /// Chunked only when the size is strictly above `threshold` and the
    /// server advertises byte ranges.
    #[must_use]
    pub fn select(total_size: u64, supports_ranges: bool, threshold: u64) -> Self {
        if total_size > threshold && supports_ranges {
            Self::Chunked
        } else {
            Self::SingleStream
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chunked => write!(f, "chunked"),
            Self::SingleStream => write!(f, "single-stream"),
        }
    }
}

/// One resolved link being downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// The link as supplied by the user.
    pub link: String,
    /// Direct download URL.
    pub url: String,
    /// Output file path.
    pub destination: PathBuf,
    /// Size in bytes, 0 until probed or when unknown.
    pub total_size: u64,
    /// Whether the server advertised byte ranges.
    pub supports_ranges: bool,
}

impl DownloadJob {
    /// Creates an unprobed job.
    pub fn new(
        link: impl Into<String>,
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            link: link.into(),
            url: url.into(),
            destination: destination.into(),
            total_size: 0,
            supports_ranges: false,
        }
    }

    /// Records what the metadata probe learned.
    pub fn apply_probe(&mut self, probe: ProbeResult) {
        self.total_size = probe.total_size;
        self.supports_ranges = probe.supports_ranges;
    }
}

/// Details of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Strategy that produced the file.
    pub strategy: Strategy,
    /// Expected size, 0 if it never became known.
    pub total_size: u64,
    /// Bytes actually written.
    pub downloaded: u64,
    /// Wall-clock duration including pauses.
    pub elapsed: Duration,
    /// Output file.
    pub path: PathBuf,
    /// Indices of chunks that failed every attempt, ascending. Their byte
    /// ranges are zero-filled in the output file.
    pub failed_chunks: Vec<usize>,
}

impl JobReport {
    /// True when no chunk was left as a gap.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty()
    }
}

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The transfer ran to the end; see [`JobReport::failed_chunks`] for gaps.
    Completed(JobReport),
    /// The transfer could not be carried out.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
    /// Cancellation was requested before the transfer finished.
    Cancelled,
}

enum TransferResult {
    Finished {
        downloaded: u64,
        total: u64,
        failed_chunks: Vec<usize>,
    },
    RangesIgnored,
    Cancelled,
}

/// Runs one job at a time with the chunked or single-stream strategy.
#[derive(Debug, Clone)]
pub struct DownloadScheduler {
    client: HttpClient,
    config: EngineConfig,
    probe: RangeProbe,
    gate: PauseGate,
    cancel: CancellationToken,
    events: EventSink,
}

impl DownloadScheduler {
    /// Creates a scheduler sharing `gate` and `cancel` with its controller.
    #[must_use]
    pub fn new(
        client: HttpClient,
        config: EngineConfig,
        gate: PauseGate,
        cancel: CancellationToken,
        events: EventSink,
    ) -> Self {
        let probe = RangeProbe::new(client.clone(), config.probe_timeout);
        Self {
            client,
            config,
            probe,
            gate,
            cancel,
            events,
        }
    }

    /// Probes, downloads and finalizes `job`.
    ///
    /// Never retries the job as a whole; retries happen per chunk only.
    #[instrument(skip(self, job), fields(url = %job.url, path = %job.destination.display()))]
    pub async fn run(&self, mut job: DownloadJob) -> JobOutcome {
        if self.cancel.is_cancelled() {
            return JobOutcome::Cancelled;
        }
        let started = Instant::now();

        let probe = self.probe.probe(&job.url).await;
        job.apply_probe(probe);
        self.events.log(
            LogEntry::new(LogLevel::Info, "File identified")
                .detail("Name", file_name_of(&job.destination))
                .detail("Size", format!("{:.1} MB", mebibytes(job.total_size))),
        );

        let mut strategy = Strategy::select(
            job.total_size,
            job.supports_ranges,
            self.config.chunked_threshold,
        );
        info!(
            total_size = job.total_size,
            supports_ranges = job.supports_ranges,
            %strategy,
            "starting transfer"
        );
        self.events.status("Downloading");

        let mut result = match strategy {
            Strategy::Chunked => self.run_chunked(&job).await,
            Strategy::SingleStream => self.run_single_stream(&job).await,
        };

        if matches!(result, Ok(TransferResult::RangesIgnored)) {
            warn!("server ignored byte ranges; falling back to single stream");
            self.events.log(
                LogEntry::new(LogLevel::Warning, "Server ignored byte ranges")
                    .detail("Fallback", Strategy::SingleStream),
            );
            strategy = Strategy::SingleStream;
            result = self.run_single_stream(&job).await;
        }

        match result {
            Ok(TransferResult::Finished {
                downloaded,
                total,
                failed_chunks,
            }) => self.finish(&job, strategy, started, downloaded, total, failed_chunks),
            Ok(TransferResult::Cancelled | TransferResult::RangesIgnored) => {
                info!("transfer cancelled");
                JobOutcome::Cancelled
            }
            Err(error) => {
                warn!(error = %error, "transfer failed");
                JobOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    fn finish(
        &self,
        job: &DownloadJob,
        strategy: Strategy,
        started: Instant,
        downloaded: u64,
        total: u64,
        mut failed_chunks: Vec<usize>,
    ) -> JobOutcome {
        failed_chunks.sort_unstable();
        let elapsed = started.elapsed();

        if !failed_chunks.is_empty() {
            let listed = failed_chunks
                .iter()
                .map(|i| (i + 1).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.events.log(
                LogEntry::new(LogLevel::Warning, "Missing chunks")
                    .detail("Chunks", &listed)
                    .detail("Path", job.destination.display()),
            );
            if self.config.fail_on_chunk_error {
                return JobOutcome::Failed {
                    reason: format!(
                        "{} chunk(s) failed permanently: {listed}",
                        failed_chunks.len()
                    ),
                };
            }
        }

        info!(
            downloaded,
            total,
            elapsed_ms = elapsed.as_millis(),
            failed_chunks = failed_chunks.len(),
            "download completed"
        );
        self.events.log(
            LogEntry::new(LogLevel::Success, "Download completed")
                .detail("Time", format!("{:.1}s", elapsed.as_secs_f64()))
                .detail("Path", job.destination.display()),
        );

        JobOutcome::Completed(JobReport {
            strategy,
            total_size: total,
            downloaded,
            elapsed,
            path: job.destination.clone(),
            failed_chunks,
        })
    }

    async fn run_chunked(&self, job: &DownloadJob) -> Result<TransferResult, DownloadError> {
        let total = job.total_size;
        preallocate(&job.destination, total).await?;

        let mut pending: VecDeque<ChunkSpec> =
            partition_chunks(total, self.config.chunk_size).into();
        info!(
            chunks = pending.len(),
            chunk_size = self.config.chunk_size,
            concurrency = self.config.concurrency,
            "dispatching chunks"
        );

        // Fetchers stop on session cancel or when this job abandons them.
        let job_cancel = self.cancel.child_token();
        let fetcher = Arc::new(ChunkFetcher::new(
            self.client.clone(),
            job.url.clone(),
            job.destination.clone(),
            self.config.retry_policy(),
            self.gate.clone(),
            job_cancel.clone(),
            self.config.chunk_read_increment,
            self.events.clone(),
        ));

        let mut progress = TransferProgress::new(total, self.config.sample_interval, &self.events);
        let mut pause_rx = self.gate.subscribe();
        if *pause_rx.borrow_and_update() {
            progress.on_pause_start();
        }

        let mut tasks: JoinSet<Result<u64, ChunkError>> = JoinSet::new();
        let mut task_chunks: HashMap<Id, usize> = HashMap::new();
        let mut failed_chunks = Vec::new();
        let concurrency = self.config.concurrency.max(1);

        let dispatch = |tasks: &mut JoinSet<Result<u64, ChunkError>>,
                        task_chunks: &mut HashMap<Id, usize>,
                        pending: &mut VecDeque<ChunkSpec>| {
            while tasks.len() < concurrency {
                let Some(spec) = pending.pop_front() else {
                    break;
                };
                let fetcher = Arc::clone(&fetcher);
                let handle = tasks.spawn(async move { fetcher.fetch(spec).await });
                task_chunks.insert(handle.id(), spec.index);
            }
        };

        dispatch(&mut tasks, &mut task_chunks, &mut pending);

        while !tasks.is_empty() {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    job_cancel.cancel();
                    debug!(outstanding = tasks.len(), "abandoning outstanding chunks");
                    tasks.detach_all();
                    return Ok(TransferResult::Cancelled);
                }
                changed = pause_rx.changed() => {
                    if changed.is_ok() {
                        if *pause_rx.borrow_and_update() {
                            progress.on_pause_start();
                        } else {
                            progress.on_pause_end();
                        }
                    }
                }
                Some(joined) = tasks.join_next_with_id() => {
                    match joined {
                        Ok((id, Ok(bytes))) => {
                            task_chunks.remove(&id);
                            progress.add(bytes);
                        }
                        Ok((id, Err(ChunkError::Cancelled { .. }))) => {
                            task_chunks.remove(&id);
                        }
                        Ok((
                            _,
                            Err(ChunkError::Failed {
                                source: DownloadError::RangeIgnored { .. },
                                ..
                            }),
                        )) => {
                            job_cancel.cancel();
                            tasks.shutdown().await;
                            return Ok(TransferResult::RangesIgnored);
                        }
                        Ok((id, Err(error))) => {
                            task_chunks.remove(&id);
                            warn!(chunk = error.index(), error = %error, "chunk failed");
                            self.events.log(
                                LogEntry::new(LogLevel::Warning, "Chunk failed")
                                    .detail("Chunk", error.index() + 1)
                                    .detail("Error", &error),
                            );
                            failed_chunks.push(error.index());
                        }
                        Err(join_error) => {
                            let index = task_chunks.remove(&join_error.id());
                            warn!(chunk = ?index, error = %join_error, "chunk task panicked");
                            if let Some(index) = index {
                                failed_chunks.push(index);
                            }
                        }
                    }
                    dispatch(&mut tasks, &mut task_chunks, &mut pending);
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Ok(TransferResult::Cancelled);
        }

        progress.finish();
        Ok(TransferResult::Finished {
            downloaded: progress.downloaded(),
            total,
            failed_chunks,
        })
    }

    async fn run_single_stream(&self, job: &DownloadJob) -> Result<TransferResult, DownloadError> {
        if !self.gate.wait_resumed(&self.cancel).await {
            return Ok(TransferResult::Cancelled);
        }

        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Ok(TransferResult::Cancelled),
            response = self.client.get(&job.url, None) => response?,
        };
        let total = if job.total_size > 0 {
            job.total_size
        } else {
            response.content_length().unwrap_or(0)
        };

        let path = &job.destination;
        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        let increment = self.config.stream_read_increment.max(1);
        let mut progress = TransferProgress::new(total, self.config.sample_interval, &self.events);
        let mut buffer: Vec<u8> = Vec::with_capacity(increment);
        let mut stream = response.bytes_stream();

        loop {
            let item = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(TransferResult::Cancelled),
                item = stream.next() => item,
            };
            let Some(item) = item else { break };
            let bytes = item.map_err(|e| DownloadError::network(&job.url, e))?;
            buffer.extend_from_slice(&bytes);
            if buffer.len() < increment {
                continue;
            }

            file.write_all(&buffer)
                .await
                .map_err(|e| DownloadError::io(path, e))?;
            progress.add(buffer.len() as u64);
            buffer.clear();

            if self.gate.is_paused() {
                progress.on_pause_start();
                let running = self.gate.wait_resumed(&self.cancel).await;
                progress.on_pause_end();
                if !running {
                    return Ok(TransferResult::Cancelled);
                }
            }
            if self.cancel.is_cancelled() {
                return Ok(TransferResult::Cancelled);
            }
        }

        if !buffer.is_empty() {
            file.write_all(&buffer)
                .await
                .map_err(|e| DownloadError::io(path, e))?;
            progress.add(buffer.len() as u64);
        }
        file.flush().await.map_err(|e| DownloadError::io(path, e))?;

        let downloaded = progress.downloaded();
        if total > 0 && downloaded < total {
            return Err(DownloadError::incomplete(&job.url, total, downloaded));
        }

        progress.finish();
        Ok(TransferResult::Finished {
            downloaded,
            total,
            failed_chunks: Vec::new(),
        })
    }
}

/// Single-writer byte counter and estimator for one transfer.
struct TransferProgress<'a> {
    downloaded: u64,
    estimator: SpeedEstimator,
    events: &'a EventSink,
}

impl<'a> TransferProgress<'a> {
    fn new(total: u64, sample_interval: Duration, events: &'a EventSink) -> Self {
        events.emit(DownloadEvent::Progress {
            downloaded: 0,
            total,
        });
        Self {
            downloaded: 0,
            estimator: SpeedEstimator::new(total, sample_interval),
            events,
        }
    }

    fn downloaded(&self) -> u64 {
        self.downloaded
    }

    fn add(&mut self, bytes: u64) {
        self.downloaded += bytes;
        if let Some(sample) = self.estimator.record(self.downloaded) {
            self.publish(&sample);
        }
    }

    fn on_pause_start(&mut self) {
        self.estimator.on_pause_start();
    }

    fn on_pause_end(&mut self) {
        self.estimator.on_pause_end();
    }

    fn finish(&mut self) {
        self.estimator.on_pause_end();
        let sample = self.estimator.sample_at(self.downloaded, Instant::now());
        self.publish(&sample);
    }

    fn publish(&self, sample: &SpeedSample) {
        self.events.emit(DownloadEvent::Speed {
            megabytes_per_sec: sample.megabytes_per_sec(),
        });
        self.events.emit(DownloadEvent::Progress {
            downloaded: sample.downloaded,
            total: sample.total,
        });
        self.events.log(
            LogEntry::new(LogLevel::Progress, "Progress update")
                .detail("Speed", format!("{:.1} MB/s", sample.megabytes_per_sec()))
                .detail("ETA", sample.eta_display())
                .detail(
                    "Downloaded",
                    format!(
                        "{:.1}/{:.1} MB",
                        mebibytes(sample.downloaded),
                        mebibytes(sample.total)
                    ),
                ),
        );
    }
}

/// Creates or truncates `path` and extends it to `total` zero bytes.
async fn preallocate(path: &Path, total: u64) -> Result<(), DownloadError> {
    let file = File::create(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.set_len(total)
        .await
        .map_err(|e| DownloadError::io(path, e))
}

#[allow(clippy::cast_precision_loss)]
fn mebibytes(bytes: u64) -> f64 {
    bytes as f64 / MIB as f64
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
