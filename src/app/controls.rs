//! Interactive controls: stdin commands and Ctrl-C.

use std::io::{self, BufRead};
use std::sync::Arc;

use linkfetch_core::DownloadController;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A command typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlCommand {
    Pause,
    Resume,
    Cancel,
}

/// Parses one stdin line: `p`/`pause`, `r`/`resume`, `q`/`quit`/`cancel`.
pub(crate) fn parse_command(line: &str) -> Option<ControlCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(ControlCommand::Pause),
        "r" | "resume" => Some(ControlCommand::Resume),
        "q" | "quit" | "cancel" => Some(ControlCommand::Cancel),
        _ => None,
    }
}

/// Applies a command to the controller.
pub(crate) fn apply(controller: &DownloadController, command: ControlCommand) {
    match command {
        ControlCommand::Pause => {
            controller.pause();
        }
        ControlCommand::Resume => {
            controller.resume();
        }
        ControlCommand::Cancel => controller.cancel(),
    }
}

/// Reads commands from stdin until EOF or cancellation.
///
/// The blocking read runs on a detached OS thread so a pending read never
/// holds up runtime shutdown.
pub(crate) fn spawn_stdin_controls(controller: Arc<DownloadController>) -> JoinHandle<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let token = controller.cancellation_token();
        loop {
            let line = tokio::select! {
                () = token.cancelled() => break,
                line = rx.recv() => line,
            };
            let Some(line) = line else { break };
            match parse_command(&line) {
                Some(command) => apply(&controller, command),
                None if line.trim().is_empty() => {}
                None => debug!(input = %line.trim(), "ignoring unknown command"),
            }
        }
    })
}

/// Cancels the controller on the first Ctrl-C.
pub(crate) fn spawn_ctrl_c_handler(controller: Arc<DownloadController>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let token = controller.cancellation_token();
        tokio::select! {
            () = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    controller.cancel();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use linkfetch_core::{DirectResolver, EngineConfig};

    use super::*;

    #[test]
    fn test_parse_command_accepts_short_and_long_forms() {
        assert_eq!(parse_command("p"), Some(ControlCommand::Pause));
        assert_eq!(parse_command(" PAUSE \n"), Some(ControlCommand::Pause));
        assert_eq!(parse_command("r"), Some(ControlCommand::Resume));
        assert_eq!(parse_command("resume"), Some(ControlCommand::Resume));
        assert_eq!(parse_command("q"), Some(ControlCommand::Cancel));
        assert_eq!(parse_command("cancel"), Some(ControlCommand::Cancel));
        assert_eq!(parse_command("x"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_apply_drives_controller() {
        let (controller, _rx) = DownloadController::new(
            Arc::new(DirectResolver::new()),
            EngineConfig::default(),
            "unused",
        )
        .expect("controller");

        apply(&controller, ControlCommand::Pause);
        assert!(controller.is_paused());
        apply(&controller, ControlCommand::Resume);
        assert!(!controller.is_paused());
        apply(&controller, ControlCommand::Cancel);
        assert!(controller.is_cancelled());
    }
}
