//! Cumulative-average speed and ETA estimation.
//!
//! Speed is total bytes over active (non-paused) elapsed time since the job
//! started. It is not a sliding window, so it reacts slowly to sudden
//! changes in throughput; that is a known characteristic of the estimator.

use std::time::{Duration, Instant};

use super::constants::MIB;

/// One externally visible speed/progress reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSample {
    /// Bytes transferred so far.
    pub downloaded: u64,
    /// Expected total, 0 when unknown.
    pub total: u64,
    /// Average bytes per second over active time.
    pub bytes_per_sec: f64,
    /// Active (non-paused) time since the job started.
    pub active_elapsed: Duration,
}

impl SpeedSample {
    /// Speed in MiB per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn megabytes_per_sec(&self) -> f64 {
        self.bytes_per_sec / MIB as f64
    }

    /// Seconds remaining at the current speed; `None` when speed is not positive.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn eta_secs(&self) -> Option<f64> {
        if self.bytes_per_sec > 0.0 {
            Some(self.total.saturating_sub(self.downloaded) as f64 / self.bytes_per_sec)
        } else {
            None
        }
    }

    /// ETA rendered as `HH:MM:SS`, or `--:--` when it cannot be estimated.
    #[must_use]
    pub fn eta_display(&self) -> String {
        format_eta(self.eta_secs())
    }
}

/// Formats an ETA in seconds as `HH:MM:SS`; `None` and non-positive values give `--:--`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_eta(seconds: Option<f64>) -> String {
    match seconds {
        Some(secs) if secs > 0.0 && secs.is_finite() => {
            let whole = secs as u64;
            let hours = whole / 3600;
            let minutes = (whole % 3600) / 60;
            let secs = whole % 60;
            format!("{hours:02}:{minutes:02}:{secs:02}")
        }
        _ => "--:--".to_string(),
    }
}

/// Per-job estimator.
///
/// Owned by the single task that aggregates transfer progress; it is never
/// shared between writers.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    total: u64,
    started_at: Instant,
    last_sample_at: Instant,
    paused_since: Option<Instant>,
    paused_total: Duration,
    sample_interval: Duration,
}

impl SpeedEstimator {
    /// Starts timing now.
    #[must_use]
    pub fn new(total: u64, sample_interval: Duration) -> Self {
        Self::started_at(total, sample_interval, Instant::now())
    }

    /// Starts timing at `now`.
    #[must_use]
    pub fn started_at(total: u64, sample_interval: Duration, now: Instant) -> Self {
        Self {
            total,
            started_at: now,
            last_sample_at: now,
            paused_since: None,
            paused_total: Duration::ZERO,
            sample_interval,
        }
    }

    /// Records progress; returns a sample only when the throttle interval has passed.
    pub fn record(&mut self, downloaded: u64) -> Option<SpeedSample> {
        self.record_at(downloaded, Instant::now())
    }

    /// Throttled [`record`](Self::record) against an explicit clock reading.
    pub fn record_at(&mut self, downloaded: u64, now: Instant) -> Option<SpeedSample> {
        if now.saturating_duration_since(self.last_sample_at) <= self.sample_interval {
            return None;
        }
        self.last_sample_at = now;
        Some(self.sample_at(downloaded, now))
    }

    /// Unthrottled sample, used for the final reading of a job.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_at(&self, downloaded: u64, now: Instant) -> SpeedSample {
        let active_elapsed = self.active_elapsed_at(now);
        let secs = active_elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 {
            downloaded as f64 / secs
        } else {
            0.0
        };
        SpeedSample {
            downloaded,
            total: self.total,
            bytes_per_sec,
            active_elapsed,
        }
    }

    /// Marks the start of a pause. No-op while already paused.
    pub fn on_pause_start(&mut self) {
        self.on_pause_start_at(Instant::now());
    }

    /// Marks the end of a pause. No-op while running.
    pub fn on_pause_end(&mut self) {
        self.on_pause_end_at(Instant::now());
    }

    /// [`on_pause_start`](Self::on_pause_start) against an explicit clock reading.
    pub fn on_pause_start_at(&mut self, now: Instant) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    /// [`on_pause_end`](Self::on_pause_end) against an explicit clock reading.
    pub fn on_pause_end_at(&mut self, now: Instant) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += now.saturating_duration_since(since);
        }
    }

    /// Total time spent paused so far, including an open pause.
    #[must_use]
    pub fn paused_total_at(&self, now: Instant) -> Duration {
        let open = self
            .paused_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
        self.paused_total + open
    }

    /// Wall-clock time since start minus paused time.
    #[must_use]
    pub fn active_elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
            .saturating_sub(self.paused_total_at(now))
    }
}
