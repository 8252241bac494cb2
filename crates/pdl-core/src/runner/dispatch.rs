//! Serialized completion counting and delegate dispatch.

use std::sync::{Arc, Mutex, PoisonError};

use super::delegate::{JobOutcome, RunDelegate};
use super::error::TransferError;
use super::job::{Job, Subtask};

#[derive(Debug, Default)]
struct RunState {
    total: usize,
    completed: usize,
    failed: usize,
    interrupted: usize,
    finished: bool,
}

/// Owns the run counters and the delegate. Every callback goes through one
/// mutex so concurrent job slots never interleave delegate calls.
pub(crate) struct Dispatcher {
    delegate: Arc<dyn RunDelegate>,
    state: Mutex<RunState>,
}

impl Dispatcher {
    pub(crate) fn new(delegate: Arc<dyn RunDelegate>, total: usize) -> Self {
        Self {
            delegate,
            state: Mutex::new(RunState {
                total,
                ..RunState::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn progress(
        &self,
        job: &Job,
        subtask: &Subtask,
        progress: f64,
        error: Option<&TransferError>,
    ) {
        let _state = self.lock();
        self.delegate.on_progress(job, subtask, progress, error);
    }

    pub(crate) fn job_failed(&self, job: &Job, error: &TransferError) {
        let _state = self.lock();
        tracing::warn!(asset = job.asset_id(), "sub-task failed: {}", error);
        self.delegate.on_job_failed(job, error);
    }

    /// Count `job` as done and report aggregate progress (and run finish when due).
    pub(crate) fn job_completed(&self, job: &Job, outcome: JobOutcome) {
        let mut state = self.lock();
        if state.completed >= state.total {
            tracing::error!(asset = job.asset_id(), "job completed after run was already full");
            return;
        }
        state.completed += 1;
        match outcome {
            JobOutcome::Succeeded => {}
            JobOutcome::Failed => state.failed += 1,
            JobOutcome::Interrupted => state.interrupted += 1,
        }
        self.delegate.on_job_completed(job, outcome);
        self.delegate
            .on_aggregate_progress(state.completed, state.total);
        if state.completed == state.total && !state.finished {
            state.finished = true;
            tracing::info!(total = state.total, failed = state.failed, "run finished");
            self.delegate.on_run_finished();
        }
    }

    /// Finish a run that has no jobs at all.
    pub(crate) fn finish_empty(&self) {
        let mut state = self.lock();
        if state.total == 0 && !state.finished {
            state.finished = true;
            self.delegate.on_aggregate_progress(0, 0);
            self.delegate.on_run_finished();
        }
    }

    /// `(completed, failed, interrupted)` so far.
    pub(crate) fn counts(&self) -> (usize, usize, usize) {
        let state = self.lock();
        (state.completed, state.failed, state.interrupted)
    }
}
