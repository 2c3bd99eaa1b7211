//! Linkfetch Core Library
//!
//! This library provides the engine behind the `linkfetch` tool, which turns
//! a list of file-host links into files on disk using parallel HTTP byte-range
//! requests with pause/resume, retries and live speed reporting.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Probe, chunk fetcher, scheduler, pause gate, speed estimator
//! - [`resolver`] - Link to download URL resolution
//! - [`session`] - Sequential processing of a link list
//! - [`control`] - Start/pause/resume/cancel surface for a presentation layer
//! - [`events`] - Typed events consumed by the presentation layer
//! - [`links`] - Text file link list persistence

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod control;
pub mod download;
pub mod events;
pub mod links;
pub mod resolver;
pub mod session;

// Re-export commonly used types
pub use control::DownloadController;
pub use download::{
    DownloadError, DownloadJob, DownloadScheduler, EngineConfig, EngineError, HttpClient,
    JobOutcome, JobReport, PauseGate, Strategy,
};
pub use events::{DownloadEvent, EventSink, LogEntry, LogLevel, SessionSummary};
pub use links::{LinkList, LinkListError};
pub use resolver::{DirectResolver, PageResolver, ResolveError, ResolvedLink, Resolver};
pub use session::{SessionError, SessionRunner};
