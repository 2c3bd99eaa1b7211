//! Cooperative suspend/resume signal shared by every transfer task.
//!
//! Pausing never interrupts a network read in flight. Tasks observe the gate
//! at their decision points: before issuing a request and between body
//! increments. Cancellation always wins over staying paused.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shared Paused/Running flag.
///
/// Clones share the same state. The only transitions are Paused to Running
/// and back; repeated `pause()` or `resume()` calls leave it unchanged.
#[derive(Debug, Clone)]
pub struct PauseGate {
    state: Arc<watch::Sender<bool>>,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    /// Creates a gate in the Running state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Moves to Paused. Returns false if already paused.
    pub fn pause(&self) -> bool {
        self.set(true)
    }

    /// Moves to Running. Returns false if already running.
    pub fn resume(&self) -> bool {
        self.set(false)
    }

    /// Returns true while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.state.borrow()
    }

    /// Waits until the gate is Running or `cancel` fires.
    ///
    /// Returns true when running, false when cancelled. Returns immediately
    /// if the gate is not paused.
    pub async fn wait_resumed(&self, cancel: &CancellationToken) -> bool {
        let mut rx = self.state.subscribe();
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let paused = *rx.borrow_and_update();
            if !paused {
                return true;
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return true;
                    }
                }
            }
        }
    }

    /// Receiver that observes every transition, for pause-time accounting.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    fn set(&self, paused: bool) -> bool {
        self.state.send_if_modified(|current| {
            if *current == paused {
                false
            } else {
                *current = paused;
                true
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_gate_starts_running() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused());
    }

    #[test]
    fn test_pause_and_resume_are_idempotent() {
        let gate = PauseGate::new();
        assert!(gate.pause());
        assert!(!gate.pause(), "second pause must not change state");
        assert!(gate.is_paused());

        assert!(gate.resume());
        assert!(!gate.resume(), "resume while running must not change state");
        assert!(!gate.is_paused());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = PauseGate::new();
        let other = gate.clone();
        other.pause();
        assert!(gate.is_paused());
    }

    #[tokio::test]
    async fn test_wait_resumed_returns_immediately_when_running() {
        let gate = PauseGate::new();
        let cancel = CancellationToken::new();
        assert!(gate.wait_resumed(&cancel).await);
    }

    #[tokio::test]
    async fn test_wait_resumed_blocks_until_resume() {
        let gate = PauseGate::new();
        let cancel = CancellationToken::new();
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.wait_resumed(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished(), "waiter must block while paused");

        gate.resume();
        let resumed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(resumed);
    }

    #[tokio::test]
    async fn test_cancel_takes_priority_over_pause() {
        let gate = PauseGate::new();
        let cancel = CancellationToken::new();
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.wait_resumed(&cancel).await })
        };

        cancel.cancel();
        let resumed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(!resumed, "cancellation must release a paused waiter");
        assert!(gate.is_paused(), "cancel does not flip the gate");
    }

    #[tokio::test]
    async fn test_subscriber_sees_transitions_once() {
        let gate = PauseGate::new();
        let mut rx = gate.subscribe();

        gate.pause();
        gate.pause();
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(!rx.has_changed().unwrap(), "duplicate pause must not notify");
    }
}
