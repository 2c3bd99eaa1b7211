//! Terminal rendering of engine events: one progress bar plus log lines.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use linkfetch_core::{DownloadEvent, LogEntry, LogLevel};

const BAR_TEMPLATE: &str =
    "{msg:30!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {prefix:>10} ({eta})";

/// Renders [`DownloadEvent`]s to the terminal.
///
/// With a live bar, log lines are printed above it; without one (piped
/// output, `--quiet`) they go straight to stderr.
pub(crate) struct ProgressRenderer {
    bar: ProgressBar,
    live: bool,
    quiet: bool,
}

impl ProgressRenderer {
    /// Creates a renderer; `live` enables the progress bar.
    pub(crate) fn new(live: bool, quiet: bool) -> Self {
        let bar = if live {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.enable_steady_tick(Duration::from_millis(200));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar, live, quiet }
    }

    /// Applies one event.
    pub(crate) fn handle(&self, event: &DownloadEvent) {
        match event {
            DownloadEvent::Log(entry) => self.print_entry(entry),
            DownloadEvent::Progress { downloaded, total } => {
                if *total > 0 {
                    self.bar.set_length(*total);
                }
                self.bar.set_position(*downloaded);
            }
            DownloadEvent::FileIdentified { filename } => {
                self.bar.reset();
                self.bar.set_message(filename.clone());
            }
            DownloadEvent::Status { text } => {
                if text == "Paused" || text.starts_with("Resuming") {
                    self.bar.set_prefix(text.clone());
                } else {
                    self.bar.set_prefix(String::new());
                }
            }
            DownloadEvent::Speed { megabytes_per_sec } => {
                if !self.bar.prefix().starts_with("Paused") {
                    self.bar.set_prefix(format!("{megabytes_per_sec:.1} MB/s"));
                }
            }
            DownloadEvent::LinkCompleted { .. } | DownloadEvent::LinkFailed { .. } => {}
            DownloadEvent::SessionFinished(_) => self.bar.finish_and_clear(),
        }
    }

    fn print_entry(&self, entry: &LogEntry) {
        if !should_print(entry.level, self.live, self.quiet) {
            return;
        }
        let line = format_log_line(entry);
        if self.live {
            self.bar.println(line);
        } else {
            eprintln!("{line}");
        }
    }
}

/// Progress lines are redundant next to a live bar; quiet mode keeps only
/// trouble.
fn should_print(level: LogLevel, live: bool, quiet: bool) -> bool {
    if quiet {
        return matches!(level, LogLevel::Warning | LogLevel::Error);
    }
    !(live && level == LogLevel::Progress)
}

/// `[HH:MM:SS] <icon> title` followed by indented detail lines.
pub(crate) fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "[{}] {} {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.level.icon(),
        entry
    )
}
