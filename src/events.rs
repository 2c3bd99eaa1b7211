//! Typed events emitted by the engine for a presentation layer.
//!
//! The core never renders anything itself. Every status change, progress
//! reading and human-readable log line is sent as a [`DownloadEvent`] on an
//! unbounded channel; the consumer (terminal UI, test harness) decides what
//! to do with it.
//!
//! # Example
//!
//! ```
//! use linkfetch_core::events::{DownloadEvent, EventSink, LogEntry, LogLevel};
//!
//! let (sink, mut rx) = EventSink::channel();
//! sink.log(LogEntry::new(LogLevel::Info, "Starting download session"));
//!
//! match rx.try_recv() {
//!     Ok(DownloadEvent::Log(entry)) => assert_eq!(entry.title, "Starting download session"),
//!     other => panic!("unexpected event: {other:?}"),
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

/// Severity/kind of a user-facing log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Routine lifecycle information.
    Info,
    /// A link or session finished successfully.
    Success,
    /// Recoverable trouble: retries, chunk failures.
    Warning,
    /// A link failed.
    Error,
    /// Transfers were suspended.
    Paused,
    /// Transfers were resumed.
    Resumed,
    /// Periodic speed/ETA reading.
    Progress,
}

impl LogLevel {
    /// Short glyph used by terminal renderers.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Info => "•",
            Self::Success => "✓",
            Self::Warning => "!",
            Self::Error => "✗",
            Self::Paused => "⏸",
            Self::Resumed => "▶",
            Self::Progress => "»",
        }
    }
}

/// One timestamped, human-readable log line with optional detail fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Local wall-clock time the entry was created.
    pub timestamp: DateTime<Local>,
    /// Entry kind.
    pub level: LogLevel,
    /// Headline, e.g. "Download completed".
    pub title: String,
    /// Ordered `label: value` details.
    pub details: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates an entry stamped with the current local time.
    pub fn new(level: LogLevel, title: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            title: title.into(),
            details: Vec::new(),
        }
    }

    /// Appends a detail line.
    #[must_use]
    pub fn detail(mut self, label: impl Into<String>, value: impl fmt::Display) -> Self {
        self.details.push((label.into(), value.to_string()));
        self
    }

    /// Looks up a detail value by label.
    #[must_use]
    pub fn detail_value(&self, label: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for (label, value) in &self.details {
            write!(f, "\n   {label}: {value}")?;
        }
        Ok(())
    }
}

/// Totals reported once a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSummary {
    /// Wall-clock duration of the session.
    pub elapsed: Duration,
    /// Links picked up (resolved or attempted).
    pub processed: usize,
    /// Links that completed.
    pub completed: usize,
    /// Links that failed.
    pub failed: usize,
    /// True when the session stopped because of cancellation.
    pub cancelled: bool,
}

/// Everything the core reports to its presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// Human-readable log line.
    Log(LogEntry),
    /// Cumulative progress of the current job.
    Progress {
        /// Bytes written so far.
        downloaded: u64,
        /// Expected total, 0 when unknown.
        total: u64,
    },
    /// The current job's output filename is known.
    FileIdentified {
        /// Sanitized filename.
        filename: String,
    },
    /// Short status line ("Paused", "Resuming...", "Downloading").
    Status {
        /// Status text.
        text: String,
    },
    /// Current average speed.
    Speed {
        /// Speed in MiB per second.
        megabytes_per_sec: f64,
    },
    /// A link finished; the link list should drop it.
    LinkCompleted {
        /// The link as supplied.
        link: String,
        /// Where the file was written.
        path: PathBuf,
    },
    /// A link failed; the link list should keep it and flag it.
    LinkFailed {
        /// The link as supplied.
        link: String,
        /// Why it failed.
        reason: String,
    },
    /// The session ended.
    SessionFinished(SessionSummary),
}

/// Cloneable, non-blocking sender for [`DownloadEvent`]s.
///
/// Sending never fails the core: events sent after the receiver is dropped
/// are discarded.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<DownloadEvent>,
}

impl EventSink {
    /// Creates a sink and its receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Sends an event.
    pub fn emit(&self, event: DownloadEvent) {
        // A closed receiver only means nobody is listening.
        let _ = self.tx.send(event);
    }

    /// Sends a log entry.
    pub fn log(&self, entry: LogEntry) {
        self.emit(DownloadEvent::Log(entry));
    }

    /// Sends a status line.
    pub fn status(&self, text: impl Into<String>) {
        self.emit(DownloadEvent::Status { text: text.into() });
    }
}
