//! Shared helpers for pdl-core integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pdl_core::runner::{Job, RunDelegate, Subtask, SubtaskContext, SubtaskOp, TransferError};

/// Counts callbacks and remembers aggregate values in arrival order.
#[derive(Default)]
pub struct CountingDelegate {
    pub progress: AtomicUsize,
    pub failures: Mutex<Vec<String>>,
    pub aggregates: Mutex<Vec<(usize, usize)>>,
    pub finished: AtomicUsize,
    /// Aggregate count seen when `on_run_finished` fired.
    pub finished_after: Mutex<Option<(usize, usize)>>,
}

impl RunDelegate for CountingDelegate {
    fn on_progress(&self, _job: &Job, _subtask: &Subtask, _progress: f64, _error: Option<&TransferError>) {
        self.progress.fetch_add(1, Ordering::SeqCst);
    }

    fn on_job_failed(&self, job: &Job, _error: &TransferError) {
        self.failures.lock().unwrap().push(job.asset_id().to_string());
    }

    fn on_aggregate_progress(&self, completed: usize, total: usize) {
        self.aggregates.lock().unwrap().push((completed, total));
    }

    fn on_run_finished(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
        *self.finished_after.lock().unwrap() = self.aggregates.lock().unwrap().last().copied();
    }
}

/// Blocks until released through the shared semaphore; tracks concurrency.
pub struct GatedOp {
    pub gate: Arc<tokio::sync::Semaphore>,
    pub active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub started: Arc<AtomicUsize>,
}

impl GatedOp {
    pub fn new(gate: Arc<tokio::sync::Semaphore>) -> Self {
        Self {
            gate,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SubtaskOp for GatedOp {
    async fn run(&self, ctx: SubtaskContext) -> Result<(), TransferError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let permit = self.gate.acquire().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        match permit {
            Ok(p) => p.forget(),
            Err(e) => return Err(TransferError::Failed(e.to_string())),
        }
        ctx.report(1.0, None);
        Ok(())
    }
}

/// Sleeps for a fixed time while tracking concurrency.
pub struct SleepOp {
    pub delay: Duration,
    pub active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

#[async_trait]
impl SubtaskOp for SleepOp {
    async fn run(&self, ctx: SubtaskContext) -> Result<(), TransferError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ctx.report(0.5, None);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        ctx.report(1.0, None);
        Ok(())
    }
}

pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Write `catalog.json` plus the listed files into `root`.
pub fn write_library(root: &Path, catalog_json: &str, files: &[(&str, &[u8])]) {
    std::fs::create_dir_all(root).unwrap();
    std::fs::write(root.join("catalog.json"), catalog_json).unwrap();
    for (name, body) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, body).unwrap();
    }
}
