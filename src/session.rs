//! Session runner: walks the link list one job at a time.
//!
//! Jobs are never interleaved; only the chunks inside one job run in
//! parallel. A failed link never stops the session. Cancellation is checked
//! before each link and inside the running job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::download::filename::destination_path;
use crate::download::{DownloadJob, DownloadScheduler, JobOutcome};
use crate::events::{DownloadEvent, EventSink, LogEntry, LogLevel, SessionSummary};
use crate::resolver::Resolver;

const LINK_PREVIEW_CHARS: usize = 70;

/// Errors that stop a whole session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A condition no link can recover from. The session's cancellation
    /// token has been cancelled when this is returned.
    #[error("fatal session error: {reason}")]
    Fatal {
        /// What went wrong.
        reason: String,
    },
}

/// Drives resolver and scheduler over an ordered list of links.
pub struct SessionRunner {
    resolver: Arc<dyn Resolver>,
    scheduler: DownloadScheduler,
    output_dir: PathBuf,
    cancel: CancellationToken,
    events: EventSink,
}

impl std::fmt::Debug for SessionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner")
            .field("resolver", &self.resolver.name())
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl SessionRunner {
    /// Creates a runner writing into `output_dir`.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn Resolver>,
        scheduler: DownloadScheduler,
        output_dir: impl Into<PathBuf>,
        cancel: CancellationToken,
        events: EventSink,
    ) -> Self {
        Self {
            resolver,
            scheduler,
            output_dir: output_dir.into(),
            cancel,
            events,
        }
    }

    /// Processes `links` in order and reports a summary.
    ///
    /// Emits `LinkCompleted` or `LinkFailed` per link and a final
    /// `SessionFinished` event, also when cancelled or on a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Fatal`] if the output directory cannot be
    /// created; the cancellation token is cancelled first.
    #[instrument(skip(self, links), fields(links = links.len(), resolver = self.resolver.name()))]
    pub async fn run_session(&self, links: &[String]) -> Result<SessionSummary, SessionError> {
        let started = Instant::now();
        let mut summary = SessionSummary::default();
        self.events
            .log(LogEntry::new(LogLevel::Info, "Starting download session"));

        if let Err(error) = tokio::fs::create_dir_all(&self.output_dir).await {
            let reason = format!(
                "cannot create output directory {}: {error}",
                self.output_dir.display()
            );
            warn!(%reason, "stopping session");
            self.cancel.cancel();
            self.events
                .log(LogEntry::new(LogLevel::Error, "Session aborted").detail("Error", &reason));
            summary.cancelled = true;
            self.finish(started, summary);
            return Err(SessionError::Fatal { reason });
        }

        for (position, link) in links.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            summary.processed += 1;
            info!(position = position + 1, total = links.len(), link = %link, "processing link");
            self.events.log(
                LogEntry::new(
                    LogLevel::Info,
                    format!("Processing link {}/{}", position + 1, links.len()),
                )
                .detail("URL", preview(link)),
            );
            self.events.status("Resolving");

            let resolved = match self.resolver.resolve(link).await {
                Ok(resolved) => resolved,
                Err(error) => {
                    warn!(link = %link, error = %error, "resolution failed");
                    self.fail_link(link, &error.to_string());
                    summary.failed += 1;
                    continue;
                }
            };

            self.events.emit(DownloadEvent::FileIdentified {
                filename: resolved.filename.clone(),
            });
            let destination = destination_path(&self.output_dir, &resolved.filename);
            let job = DownloadJob::new(link.clone(), resolved.download_url, destination);

            match self.scheduler.run(job).await {
                JobOutcome::Completed(report) => {
                    summary.completed += 1;
                    self.events.emit(DownloadEvent::LinkCompleted {
                        link: link.clone(),
                        path: report.path,
                    });
                }
                JobOutcome::Failed { reason } => {
                    self.fail_link(link, &reason);
                    summary.failed += 1;
                }
                JobOutcome::Cancelled => break,
            }
        }

        summary.cancelled = self.cancel.is_cancelled();
        Ok(self.finish(started, summary))
    }

    fn fail_link(&self, link: &str, reason: &str) {
        self.events.log(
            LogEntry::new(LogLevel::Error, "Failed")
                .detail("Link", link)
                .detail("Error", reason),
        );
        self.events.emit(DownloadEvent::LinkFailed {
            link: link.to_string(),
            reason: reason.to_string(),
        });
    }

    fn finish(&self, started: Instant, mut summary: SessionSummary) -> SessionSummary {
        summary.elapsed = started.elapsed();
        info!(
            elapsed_ms = summary.elapsed.as_millis(),
            processed = summary.processed,
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "session finished"
        );
        self.events.log(
            LogEntry::new(LogLevel::Success, "Session finished")
                .detail("Duration", format!("{:.1}s", summary.elapsed.as_secs_f64()))
                .detail("Processed", format!("{} files", summary.processed)),
        );
        self.events
            .emit(DownloadEvent::SessionFinished(summary.clone()));
        summary
    }
}

fn preview(link: &str) -> String {
    if link.chars().count() > LINK_PREVIEW_CHARS {
        let head: String = link.chars().take(LINK_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        link.to_string()
    }
}
