//! Suspend / resume / cancel flags shared between the runner, its driver task and transfers.

use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of the run's control flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    /// No new jobs start while set; in-flight jobs keep running.
    pub suspended: bool,
    /// Pending jobs are dropped and transfers asked to stop.
    pub cancelled: bool,
}

/// Cloneable handle to the control flags of a [`JobRunner`](super::JobRunner).
///
/// Backed by a `watch` channel so the driver loop can sleep until the flags change.
#[derive(Clone)]
pub struct RunControl {
    state: Arc<watch::Sender<ControlState>>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlState::default());
        Self {
            state: Arc::new(tx),
        }
    }

    /// Stop starting new jobs. Already-running jobs continue to completion.
    pub fn suspend(&self) {
        self.state.send_modify(|s| s.suspended = true);
        tracing::info!("runner suspended");
    }

    /// Allow new jobs to start again.
    pub fn resume(&self) {
        self.state.send_modify(|s| s.suspended = false);
        tracing::info!("runner resumed");
    }

    /// Best-effort stop of pending and in-flight jobs. Late events may still arrive.
    pub fn cancel_all(&self) {
        self.state.send_modify(|s| s.cancelled = true);
        tracing::info!("runner cancellation requested");
    }

    pub fn is_suspended(&self) -> bool {
        self.state.borrow().suspended
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().cancelled
    }

    pub fn snapshot(&self) -> ControlState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.state.subscribe()
    }

    /// Reset per-run flags at the start of a new run.
    pub(crate) fn begin_run(&self) {
        self.state.send_modify(|s| *s = ControlState::default());
    }
}
