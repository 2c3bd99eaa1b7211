//! Control surface exposed to the presentation layer.
//!
//! A [`DownloadController`] owns the pause gate and the cancellation token
//! shared by everything it starts, and hands out the event receiver.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use linkfetch_core::control::DownloadController;
//! use linkfetch_core::download::EngineConfig;
//! use linkfetch_core::events::DownloadEvent;
//! use linkfetch_core::resolver::DirectResolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (controller, mut events) = DownloadController::new(
//!     Arc::new(DirectResolver::new()),
//!     EngineConfig::default(),
//!     "downloads",
//! )?;
//! let session = controller.start(vec!["https://example.com/file.iso".to_string()]);
//!
//! while let Some(event) = events.recv().await {
//!     if let DownloadEvent::SessionFinished(summary) = event {
//!         println!("{} completed", summary.completed);
//!         break;
//!     }
//! }
//! session.await??;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::download::{DownloadScheduler, EngineConfig, EngineError, HttpClient, PauseGate};
use crate::events::{DownloadEvent, EventSink, LogEntry, LogLevel, SessionSummary};
use crate::resolver::Resolver;
use crate::session::{SessionError, SessionRunner};

/// Start/pause/resume/cancel handle for download sessions.
///
/// Cancellation is final: once cancelled, later sessions stop immediately.
pub struct DownloadController {
    resolver: Arc<dyn Resolver>,
    client: HttpClient,
    config: EngineConfig,
    output_dir: PathBuf,
    gate: PauseGate,
    cancel: CancellationToken,
    events: EventSink,
}

impl std::fmt::Debug for DownloadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadController")
            .field("resolver", &self.resolver.name())
            .field("output_dir", &self.output_dir)
            .field("paused", &self.gate.is_paused())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl DownloadController {
    /// Validates `config`, builds an HTTP client and returns the controller
    /// with its event receiver.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for invalid settings or client build failure.
    pub fn new(
        resolver: Arc<dyn Resolver>,
        config: EngineConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Result<(Self, UnboundedReceiver<DownloadEvent>), EngineError> {
        let client = HttpClient::new(&config)?;
        Self::with_client(client, resolver, config, output_dir)
    }

    /// Like [`new`](Self::new) but reuses an existing client, e.g. the one a
    /// page resolver already holds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for invalid settings.
    pub fn with_client(
        client: HttpClient,
        resolver: Arc<dyn Resolver>,
        config: EngineConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Result<(Self, UnboundedReceiver<DownloadEvent>), EngineError> {
        config.validate()?;
        let (events, rx) = EventSink::channel();
        let controller = Self {
            resolver,
            client,
            config,
            output_dir: output_dir.into(),
            gate: PauseGate::new(),
            cancel: CancellationToken::new(),
            events,
        };
        Ok((controller, rx))
    }

    /// Spawns one background task running a session over `links`.
    #[must_use]
    pub fn start(&self, links: Vec<String>) -> JoinHandle<Result<SessionSummary, SessionError>> {
        let scheduler = DownloadScheduler::new(
            self.client.clone(),
            self.config.clone(),
            self.gate.clone(),
            self.cancel.clone(),
            self.events.clone(),
        );
        let runner = SessionRunner::new(
            Arc::clone(&self.resolver),
            scheduler,
            self.output_dir.clone(),
            self.cancel.clone(),
            self.events.clone(),
        );
        info!(links = links.len(), "starting session");
        tokio::spawn(async move { runner.run_session(&links).await })
    }

    /// Suspends transfers at their next checkpoint. Returns false if already paused.
    pub fn pause(&self) -> bool {
        let changed = self.gate.pause();
        if changed {
            self.events.status("Paused");
            self.events
                .log(LogEntry::new(LogLevel::Paused, "Download paused"));
        }
        changed
    }

    /// Lets paused transfers continue. Returns false if not paused.
    pub fn resume(&self) -> bool {
        let changed = self.gate.resume();
        if changed {
            self.events.status("Resuming...");
            self.events
                .log(LogEntry::new(LogLevel::Resumed, "Download resumed"));
        }
        changed
    }

    /// Stops dispatching new work; in-flight requests finish harmlessly.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!("cancellation requested");
            self.cancel.cancel();
        }
    }

    /// True while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// True once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observed by every task this controller starts.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resolver::DirectResolver;

    fn controller() -> (DownloadController, UnboundedReceiver<DownloadEvent>) {
        DownloadController::new(
            Arc::new(DirectResolver::new()),
            EngineConfig::default(),
            "unused",
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = EngineConfig {
            concurrency: 0,
            ..EngineConfig::default()
        };
        let result = DownloadController::new(Arc::new(DirectResolver::new()), config, "out");
        assert!(matches!(result, Err(EngineError::InvalidConcurrency { value: 0 })));
    }

    #[test]
    fn test_pause_resume_emit_status_only_on_change() {
        let (controller, mut rx) = controller();

        assert!(controller.pause());
        assert!(!controller.pause());
        assert!(controller.is_paused());
        assert!(controller.resume());
        assert!(!controller.resume());

        let statuses: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                DownloadEvent::Status { text } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, ["Paused", "Resuming..."]);
    }

    #[test]
    fn test_cancel_is_sticky() {
        let (controller, _rx) = controller();
        let token = controller.cancellation_token();
        controller.cancel();
        controller.cancel();
        assert!(controller.is_cancelled());
        assert!(token.is_cancelled());
    }
}
