//! Observer interface for run events.

use super::error::TransferError;
use super::job::{Job, Subtask};

/// How a job ended once the runner is done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every sub-task ran and returned `Ok`.
    Succeeded,
    /// At least one sub-task ended with an error.
    Failed,
    /// Cancellation stopped the job before all its sub-tasks finished.
    Interrupted,
}

impl JobOutcome {
    pub fn is_failed(self) -> bool {
        self == JobOutcome::Failed
    }
}

/// Receives everything the runner reports.
///
/// Calls are serialized: no two callbacks run at the same time, even when
/// several jobs finish concurrently. Implementations should return quickly
/// (forward to a channel rather than doing I/O inline).
pub trait RunDelegate: Send + Sync {
    /// A sub-task reported progress, optionally with an error. Forwarded unmodified.
    fn on_progress(
        &self,
        job: &Job,
        subtask: &Subtask,
        progress: f64,
        error: Option<&TransferError>,
    );

    /// A sub-task of `job` ended in failure. Fires at most once per sub-task.
    fn on_job_failed(&self, job: &Job, error: &TransferError);

    /// The runner is done with `job`. Fires right before the matching
    /// `on_aggregate_progress`.
    fn on_job_completed(&self, _job: &Job, _outcome: JobOutcome) {}

    /// `completed` of `total` jobs are done.
    fn on_aggregate_progress(&self, completed: usize, total: usize);

    /// Every job of the run has completed. Fires exactly once per run.
    fn on_run_finished(&self);
}
