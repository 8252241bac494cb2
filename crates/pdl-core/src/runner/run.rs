//! The runner: submit jobs and keep up to K of them in flight.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};

use crate::config::DEFAULT_MAX_CONCURRENT_JOBS;

use super::control::RunControl;
use super::delegate::{JobOutcome, RunDelegate};
use super::dispatch::Dispatcher;
use super::error::{RunnerError, TransferError, UnrecognizedJobKind};
use super::job::{Job, MediaKind, SubtaskContext};

/// Outcome of one run, returned by [`RunHandle::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs submitted.
    pub total: usize,
    /// Jobs that finished (successfully or not).
    pub completed: usize,
    /// Completed jobs with at least one failed sub-task.
    pub failed: usize,
    /// Completed jobs that cancellation stopped before all sub-tasks finished.
    pub interrupted: usize,
    /// Jobs dropped from the queue by `cancel_all` before they started.
    pub dropped: usize,
    /// `cancel_all` was requested during the run.
    pub cancelled: bool,
}

/// Bounded concurrent job runner.
///
/// At most `concurrency` jobs execute at once; pending jobs start in
/// submission order. Only one run may be in flight at a time.
pub struct JobRunner {
    concurrency: usize,
    delegate: Arc<dyn RunDelegate>,
    control: RunControl,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the driver task ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a submitted run.
pub struct RunHandle {
    task: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Wait until every started job has finished (or the run was cancelled and drained).
    pub async fn wait(self) -> Result<RunSummary, RunnerError> {
        Ok(self.task.await?)
    }
}

impl JobRunner {
    /// Runner with an explicit concurrency limit (`K >= 1`).
    pub fn new(concurrency: usize, delegate: Arc<dyn RunDelegate>) -> Result<Self, RunnerError> {
        if concurrency == 0 {
            return Err(RunnerError::InvalidConcurrency);
        }
        Ok(Self {
            concurrency,
            delegate,
            control: RunControl::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Runner with the default limit of four concurrent jobs.
    pub fn with_default_concurrency(delegate: Arc<dyn RunDelegate>) -> Self {
        Self {
            concurrency: DEFAULT_MAX_CONCURRENT_JOBS,
            delegate,
            control: RunControl::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Handle to suspend/resume/cancel from elsewhere (control socket, signal handler).
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn suspend(&self) {
        self.control.suspend();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn cancel_all(&self) {
        self.control.cancel_all();
    }

    pub fn is_suspended(&self) -> bool {
        self.control.is_suspended()
    }

    /// True while a submitted run has not yet drained.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a run over `jobs`. Must be called from within a tokio runtime.
    ///
    /// Resets the run counters and the suspend/cancel flags. Returns
    /// `RunInFlight` if the previous run has not drained yet.
    pub fn submit(&self, jobs: Vec<Job>) -> Result<RunHandle, RunnerError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RunnerError::RunInFlight);
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        self.control.begin_run();
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&self.delegate), jobs.len()));
        let queue: VecDeque<Arc<Job>> = jobs.into_iter().map(Arc::new).collect();
        tracing::info!(
            jobs = queue.len(),
            concurrency = self.concurrency,
            "run submitted"
        );

        let control = self.control.clone();
        let concurrency = self.concurrency;
        let task = tokio::spawn(async move {
            let _guard = guard;
            drive(queue, concurrency, dispatcher, control).await
        });
        Ok(RunHandle { task })
    }
}

/// Refill loop: keep up to `concurrency` jobs running until the queue is empty.
async fn drive(
    mut queue: VecDeque<Arc<Job>>,
    concurrency: usize,
    dispatcher: Arc<Dispatcher>,
    control: RunControl,
) -> RunSummary {
    let total = queue.len();
    let mut dropped = 0usize;
    let mut join_set = JoinSet::new();
    let mut flags = control.subscribe();

    if total == 0 {
        dispatcher.finish_empty();
    }

    loop {
        let state = *flags.borrow_and_update();

        if state.cancelled && !queue.is_empty() {
            dropped += queue.len();
            tracing::info!(dropped = queue.len(), "run cancelled; dropping pending jobs");
            queue.clear();
        }

        if !state.suspended {
            while join_set.len() < concurrency {
                let Some(job) = queue.pop_front() else {
                    break;
                };
                join_set.spawn(run_job(job, Arc::clone(&dispatcher), control.clone()));
            }
        }

        if join_set.is_empty() && queue.is_empty() {
            break;
        }

        tokio::select! {
            Some(res) = join_set.join_next(), if !join_set.is_empty() => {
                if let Err(e) = res {
                    tracing::error!("job task join: {}", e);
                }
            }
            changed = flags.changed() => {
                if changed.is_err() && join_set.is_empty() {
                    // Control handle gone while suspended with nothing running: nothing can resume us.
                    dropped += queue.len();
                    queue.clear();
                }
            }
        }
    }

    let (completed, failed, interrupted) = dispatcher.counts();
    RunSummary {
        total,
        completed,
        failed,
        interrupted,
        dropped,
        cancelled: control.is_cancelled(),
    }
}

/// Run one job's sub-tasks in order, then count it complete exactly once.
///
/// A sub-task that returns `Cancelled` after `cancel_all`, or sub-tasks skipped
/// because of it, make the job `Interrupted` rather than `Failed`. A real
/// failure earlier in the job still wins.
async fn run_job(job: Arc<Job>, dispatcher: Arc<Dispatcher>, control: RunControl) {
    let mut failed = false;
    let mut interrupted = false;

    if job.kind() == MediaKind::Unknown {
        let err = UnrecognizedJobKind {
            asset_id: job.asset_id().to_string(),
        };
        tracing::warn!("{}; skipping", err);
    } else {
        tracing::debug!(
            asset = job.asset_id(),
            subtasks = job.subtasks().len(),
            "job started"
        );
        for (index, subtask) in job.subtasks().iter().enumerate() {
            if control.is_cancelled() {
                tracing::debug!(asset = job.asset_id(), "cancelled before {}", subtask.version());
                interrupted = true;
                break;
            }
            let ctx = SubtaskContext::new(
                Arc::clone(&job),
                index,
                Arc::clone(&dispatcher),
                control.clone(),
            );
            let op = subtask.op();
            // Own task per sub-task so a panicking operation fails only that sub-task.
            let outcome = match tokio::spawn(async move { op.run(ctx).await }).await {
                Ok(outcome) => outcome,
                Err(e) => Err(TransferError::Failed(format!("sub-task aborted: {}", e))),
            };
            match outcome {
                Ok(()) => {}
                Err(TransferError::Cancelled) if control.is_cancelled() => {
                    tracing::debug!(asset = job.asset_id(), "{} stopped by cancel", subtask.version());
                    interrupted = true;
                    break;
                }
                Err(err) => {
                    failed = true;
                    dispatcher.job_failed(&job, &err);
                }
            }
        }
    }

    let outcome = if failed {
        JobOutcome::Failed
    } else if interrupted {
        JobOutcome::Interrupted
    } else {
        JobOutcome::Succeeded
    };
    dispatcher.job_completed(&job, outcome);
}
