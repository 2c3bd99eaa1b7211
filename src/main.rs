//! CLI entry point for the linkfetch tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use linkfetch_core::{
    DirectResolver, DownloadController, DownloadEvent, HttpClient, LinkList, PageResolver,
    Resolver, SessionSummary,
};
use tracing::{debug, info, warn};

mod app;
mod cli;

use app::config::{RunSettings, load_default_file_config};
use app::controls::{spawn_ctrl_c_handler, spawn_stdin_controls};
use app::progress::ProgressRenderer;
use cli::Args;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Failure,
    Interrupted,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Interrupted => ExitCode::from(130),
        }
    }
}

/// Maps a session summary to the process exit outcome.
fn determine_exit_outcome(summary: &SessionSummary) -> ProcessExit {
    if summary.cancelled {
        ProcessExit::Interrupted
    } else if summary.failed == 0 {
        ProcessExit::Success
    } else {
        ProcessExit::Failure
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let (config_path, file_config) = load_default_file_config()?;
    debug!(config_path = ?config_path, ?file_config, "file configuration loaded");
    let settings = RunSettings::resolve(&args, &file_config);

    let mut link_list = None;
    let links = if args.links.is_empty() {
        let list = LinkList::load(&settings.input_file).await.with_context(|| {
            format!("Failed to load link list '{}'", settings.input_file.display())
        })?;
        let links = list.links().to_vec();
        link_list = Some(list);
        links
    } else {
        args.links.clone()
    };

    if links.is_empty() {
        info!(
            input = %settings.input_file.display(),
            "No links to download; add links to the input file or pass them as arguments"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let client = HttpClient::new(&settings.engine).context("Failed to build HTTP client")?;
    let resolver: Arc<dyn Resolver> = if settings.direct {
        Arc::new(DirectResolver::new())
    } else {
        Arc::new(PageResolver::new(client.clone()))
    };
    info!(
        links = links.len(),
        resolver = resolver.name(),
        output = %settings.output_dir.display(),
        concurrency = settings.engine.concurrency,
        "linkfetch starting"
    );

    let (controller, mut events) = DownloadController::with_client(
        client,
        resolver,
        settings.engine.clone(),
        settings.output_dir.clone(),
    )
    .context("Invalid engine configuration")?;
    let controller = Arc::new(controller);

    let _ctrl_c = spawn_ctrl_c_handler(Arc::clone(&controller));
    if io::stdin().is_terminal() {
        let _stdin = spawn_stdin_controls(Arc::clone(&controller));
        if !args.quiet {
            eprintln!("Controls: p = pause, r = resume, q = cancel (then Enter)");
        }
    }

    let renderer = ProgressRenderer::new(io::stderr().is_terminal() && !args.quiet, args.quiet);
    let mut failed_links: Vec<(String, String)> = Vec::new();
    let mut session = controller.start(links);

    let result = loop {
        tokio::select! {
            Some(event) = events.recv() => {
                handle_event(
                    &renderer,
                    &event,
                    link_list.as_mut(),
                    settings.remove_completed,
                    &mut failed_links,
                )
                .await;
            }
            joined = &mut session => break joined,
        }
    };
    while let Ok(event) = events.try_recv() {
        handle_event(
            &renderer,
            &event,
            link_list.as_mut(),
            settings.remove_completed,
            &mut failed_links,
        )
        .await;
    }

    let summary = match result.context("Download session task failed")? {
        Ok(summary) => summary,
        Err(error) => {
            eprintln!("Error: {error}");
            return Ok(ProcessExit::Failure.into());
        }
    };

    if !failed_links.is_empty() {
        eprintln!("\nFailed links ({}):", failed_links.len());
        for (link, reason) in &failed_links {
            let reason = reason.lines().next().unwrap_or_default();
            eprintln!("  {link}\n    {reason}");
        }
    }
    info!(
        completed = summary.completed,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "linkfetch finished"
    );

    Ok(determine_exit_outcome(&summary).into())
}

async fn handle_event(
    renderer: &ProgressRenderer,
    event: &DownloadEvent,
    link_list: Option<&mut LinkList>,
    remove_completed: bool,
    failed_links: &mut Vec<(String, String)>,
) {
    renderer.handle(event);
    match event {
        DownloadEvent::LinkCompleted { link, .. } => {
            if let Some(list) = link_list
                && remove_completed
                && let Err(error) = list.remove(link).await
            {
                warn!(link = %link, error = %error, "failed to remove completed link from list");
            }
        }
        DownloadEvent::LinkFailed { link, reason } => {
            if let Some(list) = link_list {
                list.mark_failed(link);
            }
            failed_links.push((link.clone(), reason.clone()));
        }
        _ => {}
    }
}
